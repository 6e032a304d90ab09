//! Imperative update channel.
//!
//! A decoupled notification path letting external renderers observe clock
//! and window changes without a diffing re-render pass: every `emit` is
//! delivered synchronously, in registration order, to all currently
//! subscribed sinks before `emit` returns. Sinks are expected to apply
//! updates directly (e.g. mutate a rendering target).
//!
//! Delivery iterates over a snapshot of the subscriber list, so a sink that
//! unsubscribes (or subscribes) from inside its callback cannot break the
//! dispatch loop; the change takes effect from the next emission.

use crate::clock::ClockMetrics;
use crate::correlate::{Highlight, HighlightKind};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tl_common::id::TickId;

/// Typed event emitted to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// The clock moved (tick or seek); carries the O(1) counter sample.
    ClockStep {
        current_time: f64,
        active_count: u32,
        cumulative_count: u32,
        load_fraction: f64,
    },
    /// A record was appended to the window (and possibly the feed).
    WindowChanged {
        tick_id: TickId,
        timeline_len: usize,
        feed_len: usize,
        is_anomaly: bool,
    },
    /// A cross-view highlight was created.
    Highlight {
        kind: HighlightKind,
        index: usize,
        expires_at_ms: u64,
    },
}

impl UpdateEvent {
    pub fn clock_step(metrics: ClockMetrics) -> Self {
        UpdateEvent::ClockStep {
            current_time: metrics.current_time,
            active_count: metrics.active_count,
            cumulative_count: metrics.cumulative_count,
            load_fraction: metrics.load_fraction,
        }
    }

    pub fn highlight(h: Highlight) -> Self {
        UpdateEvent::Highlight {
            kind: h.kind,
            index: h.index,
            expires_at_ms: h.expires_at_ms,
        }
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"serialization_failed"}"#.to_string())
    }
}

/// Observer of engine updates.
pub trait UpdateSink: Send + Sync {
    fn on_update(&self, event: &UpdateEvent);
}

/// Subscription handle returned by [`UpdateBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

#[derive(Default)]
struct BusInner {
    next_id: u64,
    sinks: Vec<(SinkId, Arc<dyn UpdateSink>)>,
}

/// Single-threaded-in-spirit, ordered fan-out bus.
#[derive(Default)]
pub struct UpdateBus {
    inner: Mutex<BusInner>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Delivery order follows registration order.
    pub fn subscribe(&self, sink: Arc<dyn UpdateSink>) -> SinkId {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = SinkId(inner.next_id);
        inner.sinks.push((id, sink));
        id
    }

    /// Remove a sink. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SinkId) {
        let mut inner = self.inner.lock().unwrap();
        inner.sinks.retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every subscriber, synchronously and in order.
    pub fn emit(&self, event: &UpdateEvent) {
        // Snapshot first: callbacks may subscribe/unsubscribe reentrantly.
        let snapshot: Vec<Arc<dyn UpdateSink>> = {
            let inner = self.inner.lock().unwrap();
            inner.sinks.iter().map(|(_, s)| Arc::clone(s)).collect()
        };
        for sink in snapshot {
            sink.on_update(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().sinks.len()
    }

    /// Drop every subscriber; no sink is notified afterwards.
    pub fn clear(&self) {
        self.inner.lock().unwrap().sinks.clear();
    }
}
