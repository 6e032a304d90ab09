//! Stream ingestor: dual-track bounded append.
//!
//! Every accepted record becomes a [`Tick`] with the next monotonic id and
//! lands in the timeline window; anomalous ticks are additionally forked
//! into the anomaly feed. Both windows evict FIFO, independently sized, so
//! the feed is always an order-preserving subsequence of arrivals.
//!
//! Records that cannot be interpreted are dropped and reported as a
//! non-fatal parse rejection; ingestion continues.

use crate::window::ReplayWindow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tl_common::error::Result;
use tl_common::id::{TickId, TickIdAllocator};
use tl_common::record::{Candle, TickRecord};

/// One timestamped record in the primary stream.
///
/// Owned exclusively by the ingestor once appended; immutable after
/// insertion. Attribution and detection payloads stay opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub id: TickId,
    pub timestamp: String,
    pub candle: Candle,
    pub is_anomaly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<Value>,
}

impl Tick {
    fn from_record(id: TickId, record: TickRecord) -> Self {
        let candle = record.candle();
        Self {
            id,
            timestamp: record.timestamp,
            candle,
            is_anomaly: record.has_anomaly,
            attribution: record.anomaly_details,
            detection: record.detection_stats,
        }
    }
}

/// What one `ingest` call did to the two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub id: TickId,
    pub is_anomaly: bool,
    pub evicted_from_timeline: Option<TickId>,
    pub evicted_from_feed: Option<TickId>,
}

/// Bounded, ordered ingest buffer with an anomaly fork.
#[derive(Debug, Clone)]
pub struct Ingestor {
    timeline: ReplayWindow<Tick>,
    feed: ReplayWindow<Tick>,
    ids: TickIdAllocator,
}

impl Ingestor {
    pub fn new(timeline_capacity: usize, feed_capacity: usize) -> Self {
        Self {
            timeline: ReplayWindow::with_capacity(timeline_capacity),
            feed: ReplayWindow::with_capacity(feed_capacity),
            ids: TickIdAllocator::new(),
        }
    }

    /// Append one already-validated record.
    ///
    /// After return both windows satisfy their bound invariants and the
    /// returned id is unique for the lifetime of the subscription.
    pub fn ingest(&mut self, record: TickRecord) -> IngestOutcome {
        let id = self.ids.next_id();
        let tick = Tick::from_record(id, record);
        let is_anomaly = tick.is_anomaly;

        let evicted_from_feed = if is_anomaly {
            self.feed.push(tick.clone()).map(|t| t.id)
        } else {
            None
        };
        let evicted_from_timeline = self.timeline.push(tick).map(|t| t.id);

        IngestOutcome {
            id,
            is_anomaly,
            evicted_from_timeline,
            evicted_from_feed,
        }
    }

    /// Parse and append one raw JSON record.
    pub fn ingest_json(&mut self, raw: &str) -> Result<IngestOutcome> {
        let record = TickRecord::from_json(raw)?;
        Ok(self.ingest(record))
    }

    pub fn timeline(&self) -> &ReplayWindow<Tick> {
        &self.timeline
    }

    pub fn feed(&self) -> &ReplayWindow<Tick> {
        &self.feed
    }

    /// Total ids issued so far (accepted records only).
    pub fn ingested(&self) -> u64 {
        self.ids.issued()
    }

    /// Tear down both windows. Issued ids are not reused.
    pub fn clear(&mut self) {
        self.timeline.clear();
        self.feed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(ts: &str, anomaly: bool) -> TickRecord {
        TickRecord {
            timestamp: ts.to_string(),
            open: 10.0,
            high: 10.2,
            low: 9.9,
            close: 10.1,
            volume: 50_000.0,
            has_anomaly: anomaly,
            anomaly_details: None,
            detection_stats: None,
        }
    }

    #[test]
    fn test_ids_are_monotonic_across_both_tracks() {
        let mut ing = Ingestor::new(4, 2);
        let a = ing.ingest(record("t1", false)).id;
        let b = ing.ingest(record("t2", true)).id;
        let c = ing.ingest(record("t3", false)).id;
        assert!(a < b && b < c);
        assert_eq!(ing.ingested(), 3);
    }

    #[test]
    fn test_anomaly_forks_into_feed() {
        let mut ing = Ingestor::new(4, 2);
        ing.ingest(record("t1", false));
        let out = ing.ingest(record("t2", true));
        assert!(out.is_anomaly);
        assert_eq!(ing.timeline().len(), 2);
        assert_eq!(ing.feed().len(), 1);
        assert_eq!(ing.feed().get(0).unwrap().id, out.id);
    }

    #[test]
    fn test_independent_eviction() {
        let mut ing = Ingestor::new(3, 2);
        // Three anomalies fill the feed past its smaller bound.
        let a = ing.ingest(record("t1", true)).id;
        ing.ingest(record("t2", true));
        let out = ing.ingest(record("t3", true));
        assert_eq!(out.evicted_from_feed, Some(a));
        assert_eq!(out.evicted_from_timeline, None);
        assert_eq!(ing.timeline().len(), 3);
        assert_eq!(ing.feed().len(), 2);
    }

    #[test]
    fn test_parse_rejection_is_nonfatal() {
        let mut ing = Ingestor::new(4, 2);
        assert!(ing.ingest_json("{broken").is_err());
        let out = ing
            .ingest_json(r#"{"timestamp":"t1","open":1,"high":1,"low":1,"close":1,"volume":1,"hasAnomaly":false}"#)
            .unwrap();
        assert_eq!(out.id, TickId(1));
        assert_eq!(ing.timeline().len(), 1);
    }

    proptest! {
        /// Bound invariants hold at all times, and the feed is always an
        /// order-preserving (id-increasing) subsequence of arrivals.
        #[test]
        fn prop_bounds_and_subsequence(
            timeline_cap in 1usize..12,
            feed_cap in 1usize..8,
            flags in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let mut ing = Ingestor::new(timeline_cap, feed_cap);
            for (i, &anomaly) in flags.iter().enumerate() {
                ing.ingest(record(&format!("t{i}"), anomaly));
                prop_assert!(ing.timeline().len() <= timeline_cap);
                prop_assert!(ing.feed().len() <= feed_cap);
            }
            let feed_ids: Vec<_> = ing.feed().iter().map(|t| t.id).collect();
            prop_assert!(feed_ids.windows(2).all(|w| w[0] < w[1]));
            let timeline_ids: Vec<_> = ing.timeline().iter().map(|t| t.id).collect();
            prop_assert!(timeline_ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
