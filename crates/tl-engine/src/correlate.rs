//! Cross-view correlation by stable id.
//!
//! The timeline window and the anomaly feed are co-derived but differently
//! sized, and positional indices in both shift on every eviction. Lookups
//! therefore resolve lazily by id: ids are monotonic in arrival order, so a
//! position is a binary search away and can never reference an evicted tick.
//!
//! A correlation miss (the counterpart was evicted from one view but not
//! the other) is an empty result, not an error.

use crate::ingest::Tick;
use crate::window::ReplayWindow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tl_common::id::TickId;

/// Which view a position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// The full timeline window.
    Timeline,
    /// The anomaly feed.
    Feed,
}

impl HighlightKind {
    pub fn other(self) -> Self {
        match self {
            HighlightKind::Timeline => HighlightKind::Feed,
            HighlightKind::Feed => HighlightKind::Timeline,
        }
    }
}

/// Transient cross-view pointer with a time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub kind: HighlightKind,
    pub index: usize,
    pub expires_at_ms: u64,
}

/// Current positions of one tick id in both views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub timeline_index: Option<usize>,
    pub feed_index: Option<usize>,
}

/// Binary search a window for a tick id. Arrival order keeps ids strictly
/// increasing within any window, so this is exact.
pub fn index_of(window: &ReplayWindow<Tick>, id: TickId) -> Option<usize> {
    let mut lo = 0usize;
    let mut hi = window.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let entry = window.get(mid)?;
        match entry.id.cmp(&id) {
            Ordering::Equal => return Some(mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    None
}

/// Locate a tick id in both views.
pub fn locate(
    timeline: &ReplayWindow<Tick>,
    feed: &ReplayWindow<Tick>,
    id: TickId,
) -> Correlation {
    Correlation {
        timeline_index: index_of(timeline, id),
        feed_index: index_of(feed, id),
    }
}

/// Resolve a position in one view to the corresponding position in the
/// other, via the shared id. `None` when the source index is out of range
/// or the counterpart has been evicted.
pub fn resolve(
    timeline: &ReplayWindow<Tick>,
    feed: &ReplayWindow<Tick>,
    from: HighlightKind,
    index: usize,
) -> Option<(HighlightKind, usize)> {
    let (source, target) = match from {
        HighlightKind::Timeline => (timeline, feed),
        HighlightKind::Feed => (feed, timeline),
    };
    let id = source.get(index)?.id;
    index_of(target, id).map(|i| (from.other(), i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Ingestor;
    use tl_common::record::TickRecord;

    fn record(ts: &str, anomaly: bool) -> TickRecord {
        TickRecord {
            timestamp: ts.to_string(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            has_anomaly: anomaly,
            anomaly_details: None,
            detection_stats: None,
        }
    }

    /// Anomalies at every third tick, enough to cycle both windows.
    fn populated() -> Ingestor {
        let mut ing = Ingestor::new(5, 3);
        for i in 0..12 {
            ing.ingest(record(&format!("t{i}"), i % 3 == 0));
        }
        ing
    }

    #[test]
    fn test_locate_roundtrip() {
        let ing = populated();
        for tick in ing.feed().iter() {
            let found = locate(ing.timeline(), ing.feed(), tick.id);
            let feed_index = found.feed_index.expect("feed entry locates itself");
            assert_eq!(ing.feed().get(feed_index).unwrap().id, tick.id);
            if let Some(ti) = found.timeline_index {
                assert_eq!(ing.timeline().get(ti).unwrap().id, tick.id);
            }
        }
    }

    #[test]
    fn test_locate_evicted_id_is_empty() {
        let ing = populated();
        let found = locate(ing.timeline(), ing.feed(), tl_common::id::TickId(1));
        assert_eq!(found.timeline_index, None);
        assert_eq!(found.feed_index, None);
    }

    #[test]
    fn test_resolve_timeline_to_feed() {
        let mut ing = Ingestor::new(4, 4);
        ing.ingest(record("t0", false));
        ing.ingest(record("t1", true));
        ing.ingest(record("t2", false));
        let resolved = resolve(ing.timeline(), ing.feed(), HighlightKind::Timeline, 1);
        assert_eq!(resolved, Some((HighlightKind::Feed, 0)));
    }

    #[test]
    fn test_resolve_miss_when_counterpart_evicted() {
        // Feed capacity 1: the first anomaly is evicted from the feed while
        // still present in the larger timeline.
        let mut ing = Ingestor::new(8, 1);
        ing.ingest(record("t0", true));
        ing.ingest(record("t1", true));
        let resolved = resolve(ing.timeline(), ing.feed(), HighlightKind::Timeline, 0);
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_resolve_out_of_range_index() {
        let ing = populated();
        assert_eq!(
            resolve(ing.timeline(), ing.feed(), HighlightKind::Feed, 99),
            None
        );
    }

    #[test]
    fn test_index_of_all_present_ids() {
        let ing = populated();
        for (i, tick) in ing.timeline().iter().enumerate() {
            assert_eq!(index_of(ing.timeline(), tick.id), Some(i));
        }
    }
}
