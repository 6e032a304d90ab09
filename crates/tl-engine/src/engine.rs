//! Per-subscription engine instance.
//!
//! One `ReplayEngine` owns the full consistency unit for a subscription:
//! timeline window, anomaly feed, virtual clock, active highlights, and the
//! deadline queue, all behind a single mutex so any operation touching more
//! than one structure runs inside one critical section. The update bus sits
//! outside the lock; events produced during a mutation are collected and
//! emitted after the guard drops, so a sink may re-enter the engine from
//! its callback without deadlocking.
//!
//! Lifecycle is explicit: construct per scenario/subscription, `close()` on
//! teardown. After `close()` no sink is ever notified again.

use crate::aggregate::{ActivitySpan, AggregateTable, Trajectory};
use crate::bus::{SinkId, UpdateBus, UpdateEvent, UpdateSink};
use crate::clock::{ClockMetrics, VirtualClock};
use crate::correlate::{self, Correlation, Highlight, HighlightKind};
use crate::deadline::{DeadlineQueue, DeadlineToken};
use crate::ingest::Ingestor;
use crate::journal::{Journal, JournalEntry};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tl_common::error::{Error, Result};
use tl_common::id::{SubscriptionId, TickId};
use tl_common::record::{ControlCommand, TickRecord};
use tracing::{debug, info, warn};

/// Engine construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeline window capacity.
    pub timeline_capacity: usize,
    /// Anomaly feed capacity.
    pub feed_capacity: usize,
    /// Start the clock in the Playing state once an extent is known.
    pub autostart: bool,
    /// Initial playback rate multiplier.
    pub rate: f64,
    /// Default highlight time-to-live in milliseconds.
    pub highlight_ttl_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeline_capacity: 200,
            feed_capacity: 100,
            autostart: false,
            rate: 1.0,
            highlight_ttl_ms: 3000,
        }
    }
}

impl EngineConfig {
    pub fn with_capacities(mut self, timeline: usize, feed: usize) -> Self {
        self.timeline_capacity = timeline;
        self.feed_capacity = feed;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_highlight_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.highlight_ttl_ms = ttl_ms;
        self
    }
}

/// Operational counters, snapshot via [`ReplayEngine::counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounters {
    pub ticks_ingested: u64,
    pub anomalies_detected: u64,
    pub parse_errors: u64,
    pub highlights_created: u64,
}

struct EngineState {
    ingestor: Ingestor,
    clock: VirtualClock,
    table: AggregateTable,
    highlights: Vec<(DeadlineToken, Highlight)>,
    deadlines: DeadlineQueue,
    counters: EngineCounters,
    journal: Journal,
    closed: bool,
}

/// Real-time event-correlation and playback engine, one per subscription.
pub struct ReplayEngine {
    id: SubscriptionId,
    config: EngineConfig,
    state: Mutex<EngineState>,
    bus: Arc<UpdateBus>,
}

impl ReplayEngine {
    pub fn new(config: EngineConfig) -> Self {
        let mut clock = VirtualClock::new(config.autostart);
        clock.set_rate(config.rate);
        let mut journal = Journal::new();
        journal.push("system", "engine initialized");
        let id = SubscriptionId::new();
        info!(subscription = %id, timeline_capacity = config.timeline_capacity,
              feed_capacity = config.feed_capacity, "replay engine created");
        Self {
            id,
            state: Mutex::new(EngineState {
                ingestor: Ingestor::new(config.timeline_capacity, config.feed_capacity),
                clock,
                table: AggregateTable::empty(),
                highlights: Vec::new(),
                deadlines: DeadlineQueue::new(),
                counters: EngineCounters::default(),
                journal,
                closed: false,
            }),
            config,
            bus: Arc::new(UpdateBus::new()),
        }
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- update channel ----

    pub fn subscribe(&self, sink: Arc<dyn UpdateSink>) -> SinkId {
        self.bus.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SinkId) {
        self.bus.unsubscribe(id);
    }

    // ---- ingest ----

    /// Parse and append one raw JSON record from the transport.
    ///
    /// Malformed records are dropped, counted, and reported; the stream
    /// continues.
    pub fn ingest_json(&self, raw: &str) -> Result<TickId> {
        let record = {
            let mut state = self.locked()?;
            match TickRecord::from_json(raw) {
                Ok(record) => record,
                Err(err) => {
                    state.counters.parse_errors += 1;
                    warn!(subscription = %self.id, error = %err, "record rejected");
                    return Err(err);
                }
            }
        };
        self.ingest(record)
    }

    /// Append one already-parsed record.
    pub fn ingest(&self, record: TickRecord) -> Result<TickId> {
        let mut events = Vec::new();
        let id = {
            let mut state = self.locked()?;
            let outcome = state.ingestor.ingest(record);
            state.counters.ticks_ingested += 1;
            if outcome.is_anomaly {
                state.counters.anomalies_detected += 1;
                state
                    .journal
                    .push("anomaly", format!("tick {} flagged anomalous", outcome.id));
            }
            debug!(subscription = %self.id, tick = %outcome.id,
                   anomaly = outcome.is_anomaly, "tick ingested");
            events.push(UpdateEvent::WindowChanged {
                tick_id: outcome.id,
                timeline_len: state.ingestor.timeline().len(),
                feed_len: state.ingestor.feed().len(),
                is_anomaly: outcome.is_anomaly,
            });
            outcome.id
        };
        self.emit_all(events);
        Ok(id)
    }

    // ---- aggregate / extent ----

    /// Replace the entity set with validated trajectories. Rebuilds the
    /// aggregate table and resets the clock extent to `[0, table end]`.
    pub fn set_trajectories(&self, trajectories: &[Trajectory]) -> Result<()> {
        let spans: Vec<ActivitySpan> = trajectories
            .iter()
            .filter_map(Trajectory::activity_span)
            .collect();
        self.set_activity_spans(&spans)
    }

    /// Replace the entity set with raw activity spans.
    pub fn set_activity_spans(&self, spans: &[ActivitySpan]) -> Result<()> {
        let mut events = Vec::new();
        {
            let mut state = self.locked()?;
            state.table = AggregateTable::build(spans);
            let units = state.table.units();
            let max = state.table.max_unit().unwrap_or(0) as f64;
            state.clock.set_extent(0.0, max);
            state.journal.push(
                "replay",
                format!(
                    "aggregate table rebuilt: {} entities over {} units",
                    spans.len(),
                    units
                ),
            );
            info!(subscription = %self.id, entities = spans.len(),
                  units, "extent reset");
            events.push(UpdateEvent::clock_step(state.clock.sample(&state.table)));
        }
        self.emit_all(events);
        Ok(())
    }

    // ---- clock ----

    pub fn play(&self) -> Result<()> {
        self.locked()?.clock.play();
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.locked()?.clock.pause();
        Ok(())
    }

    pub fn set_rate(&self, rate: f64) -> Result<()> {
        self.locked()?.clock.set_rate(rate);
        Ok(())
    }

    /// Move the cursor (clamped) and emit the metrics at the new position.
    pub fn seek(&self, t: f64) -> Result<ClockMetrics> {
        let (metrics, event) = {
            let mut state = self.locked()?;
            state.clock.seek(t);
            let metrics = state.clock.sample(&state.table);
            (metrics, UpdateEvent::clock_step(metrics))
        };
        self.bus.emit(&event);
        Ok(metrics)
    }

    /// One scheduling step: advance the clock by `dt` scenario units.
    ///
    /// Emits nothing while paused or idle; this is a defined no-op.
    pub fn step(&self, dt: f64) -> Result<Option<ClockMetrics>> {
        let stepped = {
            let mut state = self.locked()?;
            if !state.clock.tick(dt) {
                None
            } else {
                let metrics = state.clock.sample(&state.table);
                Some((metrics, UpdateEvent::clock_step(metrics)))
            }
        };
        Ok(stepped.map(|(metrics, event)| {
            self.bus.emit(&event);
            metrics
        }))
    }

    /// Apply a playback control command from a UI or test driver.
    pub fn apply_control(&self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Pause => self.pause(),
            ControlCommand::Resume => self.play(),
            ControlCommand::SetSpeed { value } => {
                self.set_rate(ControlCommand::clamped_speed(value))
            }
        }
    }

    /// Metrics at the current cursor without moving it.
    pub fn metrics(&self) -> Result<ClockMetrics> {
        let state = self.locked()?;
        Ok(state.clock.sample(&state.table))
    }

    // ---- correlation / highlights ----

    /// Current positions of a tick id in both views.
    pub fn locate(&self, id: TickId) -> Result<Correlation> {
        let state = self.locked()?;
        Ok(correlate::locate(
            state.ingestor.timeline(),
            state.ingestor.feed(),
            id,
        ))
    }

    /// Resolve `index` in `from` to the corresponding position in the other
    /// view and highlight it for `ttl_ms`. A missing counterpart yields
    /// `Ok(None)`; that is a correlation miss, not an error.
    pub fn highlight(
        &self,
        from: HighlightKind,
        index: usize,
        ttl_ms: u64,
    ) -> Result<Option<Highlight>> {
        let created = {
            let mut state = self.locked()?;
            let resolved = correlate::resolve(
                state.ingestor.timeline(),
                state.ingestor.feed(),
                from,
                index,
            );
            match resolved {
                None => None,
                Some((kind, target_index)) => {
                    let (token, expires_at_ms) = state.deadlines.schedule(ttl_ms);
                    let highlight = Highlight {
                        kind,
                        index: target_index,
                        expires_at_ms,
                    };
                    state.highlights.push((token, highlight));
                    state.counters.highlights_created += 1;
                    state.journal.push(
                        "highlight",
                        format!("{:?} #{} highlighted", kind, target_index),
                    );
                    Some(highlight)
                }
            }
        };
        if let Some(highlight) = created {
            self.bus.emit(&UpdateEvent::highlight(highlight));
        }
        Ok(created)
    }

    /// Highlight with the configured default TTL.
    pub fn highlight_default(&self, from: HighlightKind, index: usize) -> Result<Option<Highlight>> {
        self.highlight(from, index, self.config.highlight_ttl_ms)
    }

    /// Advance the engine's virtual millisecond clock, expiring highlights
    /// whose deadline has passed.
    pub fn advance_to(&self, now_ms: u64) -> Result<()> {
        let mut state = self.locked()?;
        let expired = state.deadlines.advance_to(now_ms);
        if !expired.is_empty() {
            state
                .highlights
                .retain(|(token, _)| !expired.contains(token));
        }
        Ok(())
    }

    /// Highlights that have not yet expired.
    pub fn active_highlights(&self) -> Result<Vec<Highlight>> {
        let state = self.locked()?;
        Ok(state.highlights.iter().map(|(_, h)| *h).collect())
    }

    // ---- introspection ----

    pub fn counters(&self) -> Result<EngineCounters> {
        Ok(self.locked()?.counters)
    }

    /// Ids currently in the timeline window, arrival order.
    pub fn timeline_ids(&self) -> Result<Vec<TickId>> {
        let state = self.locked()?;
        Ok(state.ingestor.timeline().iter().map(|t| t.id).collect())
    }

    /// Ids currently in the anomaly feed, arrival order.
    pub fn feed_ids(&self) -> Result<Vec<TickId>> {
        let state = self.locked()?;
        Ok(state.ingestor.feed().iter().map(|t| t.id).collect())
    }

    /// Recent journal entries for ticker-tape consumers.
    pub fn recent_events(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.locked()?.journal.recent())
    }

    // ---- lifecycle ----

    /// Tear down the subscription: drop windows, cancel pending highlight
    /// deadlines, and remove every sink. No observer is notified after
    /// this returns. Further mutating calls fail with `SubscriptionClosed`.
    pub fn close(&self) {
        {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            if state.closed {
                return;
            }
            state.closed = true;
            state.ingestor.clear();
            state.highlights.clear();
            state.deadlines.clear();
            state.journal.push("system", "engine closed");
        }
        self.bus.clear();
        info!(subscription = %self.id, "replay engine closed");
    }

    fn locked(&self) -> Result<MutexGuard<'_, EngineState>> {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.closed {
            return Err(Error::SubscriptionClosed(self.id.to_string()));
        }
        Ok(state)
    }

    fn emit_all(&self, events: Vec<UpdateEvent>) {
        for event in &events {
            self.bus.emit(event);
        }
    }
}
