//! Virtual playback clock.
//!
//! A logical time cursor that advances on every scheduling step, decoupled
//! from wall time and from any rendering cycle. The host drives it with
//! `tick(dt)` at whatever cadence it likes; each call applies exactly its
//! own `dt`, so double-invocation within a frame cannot accumulate hidden
//! error.
//!
//! States: `Paused` and `Playing`. There is no terminal state; the clock
//! lives as long as its subscription. An extent of `[0, 0]` means no data
//! yet and makes `tick` a no-op (idle clock, not an error).

use crate::aggregate::AggregateTable;
use serde::{Deserialize, Serialize};

/// Playback clock with variable rate and wraparound loop semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualClock {
    current: f64,
    min: f64,
    max: f64,
    rate: f64,
    playing: bool,
}

/// Counters sampled at the clock's current position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockMetrics {
    pub current_time: f64,
    pub active_count: u32,
    pub cumulative_count: u32,
    pub load_fraction: f64,
}

impl VirtualClock {
    /// New idle clock. `autostart` selects the initial state once an extent
    /// is known.
    pub fn new(autostart: bool) -> Self {
        Self {
            current: 0.0,
            min: 0.0,
            max: 0.0,
            rate: 1.0,
            playing: autostart,
        }
    }

    /// Reset the extent, e.g. when switching scenario. The cursor snaps back
    /// to `min`.
    pub fn set_extent(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max.max(min);
        self.current = self.min;
    }

    pub fn extent(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// No data yet: extent is degenerate and `tick` does nothing.
    pub fn is_idle(&self) -> bool {
        self.max <= self.min
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Move the cursor. Out-of-range targets are clamped, never rejected.
    /// Returns the effective position.
    pub fn seek(&mut self, t: f64) -> f64 {
        self.current = if t.is_finite() {
            t.clamp(self.min, self.max)
        } else {
            self.min
        };
        self.current
    }

    pub fn set_rate(&mut self, rate: f64) {
        if rate.is_finite() {
            self.rate = rate;
        }
    }

    /// Advance by `dt * rate` if playing. Exceeding `max` wraps to `min`
    /// (loop semantics). Returns true when the cursor moved.
    pub fn tick(&mut self, dt: f64) -> bool {
        if !self.playing || self.is_idle() || !dt.is_finite() {
            return false;
        }
        let next = self.current + dt * self.rate;
        self.current = if next > self.max {
            self.min
        } else if next < self.min {
            self.min
        } else {
            next
        };
        true
    }

    /// Sample the aggregate table at `floor(current)`.
    pub fn sample(&self, table: &AggregateTable) -> ClockMetrics {
        let u = self.current.max(0.0).floor() as usize;
        ClockMetrics {
            current_time: self.current,
            active_count: table.active_at(u),
            cumulative_count: table.cumulative_at(u),
            load_fraction: table.load_fraction_at(u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ActivitySpan;

    fn running_clock() -> VirtualClock {
        let mut clock = VirtualClock::new(false);
        clock.set_extent(0.0, 100.0);
        clock.play();
        clock
    }

    #[test]
    fn test_initial_state_paused_and_idle() {
        let clock = VirtualClock::new(false);
        assert!(!clock.is_playing());
        assert!(clock.is_idle());
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let mut clock = VirtualClock::new(true);
        assert!(!clock.tick(5.0));
        assert_eq!(clock.current(), 0.0);
    }

    #[test]
    fn test_tick_advances_by_dt_times_rate() {
        let mut clock = running_clock();
        clock.set_rate(2.0);
        assert!(clock.tick(3.0));
        assert_eq!(clock.current(), 6.0);
        assert!(clock.tick(3.0));
        assert_eq!(clock.current(), 12.0);
    }

    #[test]
    fn test_tick_while_paused_does_not_advance() {
        let mut clock = running_clock();
        clock.tick(10.0);
        clock.pause();
        assert!(!clock.tick(10.0));
        assert_eq!(clock.current(), 10.0);
    }

    #[test]
    fn test_wraparound_to_min() {
        let mut clock = running_clock();
        clock.seek(95.0);
        assert!(clock.tick(10.0));
        // 95 + 10 exceeds 100: wrap to min, not 105 and not a modulo remainder.
        assert_eq!(clock.current(), 0.0);
    }

    #[test]
    fn test_landing_exactly_on_max_does_not_wrap() {
        let mut clock = running_clock();
        clock.seek(90.0);
        clock.tick(10.0);
        assert_eq!(clock.current(), 100.0);
    }

    #[test]
    fn test_seek_clamps() {
        let mut clock = running_clock();
        assert_eq!(clock.seek(250.0), 100.0);
        assert_eq!(clock.seek(-3.0), 0.0);
        assert_eq!(clock.seek(42.5), 42.5);
    }

    #[test]
    fn test_set_extent_resets_cursor() {
        let mut clock = running_clock();
        clock.seek(80.0);
        clock.set_extent(0.0, 50.0);
        assert_eq!(clock.current(), 0.0);
        assert!(!clock.is_idle());
    }

    #[test]
    fn test_sample_reads_floor_of_current() {
        let table = AggregateTable::build(&[
            ActivitySpan::new(0.0, 10.0),
            ActivitySpan::new(5.0, 15.0),
        ]);
        let mut clock = VirtualClock::new(false);
        clock.set_extent(0.0, 15.0);
        clock.seek(7.9);
        let metrics = clock.sample(&table);
        assert_eq!(metrics.current_time, 7.9);
        assert_eq!(metrics.active_count, 2);
        assert_eq!(metrics.cumulative_count, 2);
        assert_eq!(metrics.load_fraction, 1.0);
    }
}
