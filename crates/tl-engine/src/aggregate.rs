//! Aggregate precomputation over entity activity intervals.
//!
//! Turns a set of entities with `[start, end]` activity intervals into
//! per-time-unit active and cumulative counts, so the clock can answer
//! "how many entities are active at time u" in O(1) per step.
//!
//! Construction uses a start/end difference array with a single prefix-sum
//! pass: O(entities + table length), independent of interval durations.
//! The equivalent per-unit interval expansion lives in the tests below as
//! the correctness oracle.

use serde::{Deserialize, Serialize};
use tl_common::error::{Error, Result};

/// One entity's activity interval, in scenario time units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpan {
    pub start: f64,
    pub end: f64,
}

impl ActivitySpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// A time-indexed position sample on a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    pub x: f64,
    pub y: f64,
}

/// An entity trajectory: ordered path samples with matching timestamps.
///
/// The engine does not own trajectory data; it is supplied wholesale by an
/// external loader and consumed here only for its activity span. Rendering
/// of the path itself happens outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: String,
    pub path: Vec<PathSample>,
    pub timestamps: Vec<f64>,
}

impl Trajectory {
    /// Validate and construct a trajectory.
    ///
    /// Timestamps must be non-decreasing and match the path in length.
    pub fn new(id: impl Into<String>, path: Vec<PathSample>, timestamps: Vec<f64>) -> Result<Self> {
        let id = id.into();
        if path.len() != timestamps.len() {
            return Err(Error::InvalidTrajectory {
                id,
                reason: format!(
                    "{} path samples but {} timestamps",
                    path.len(),
                    timestamps.len()
                ),
            });
        }
        if timestamps.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidTrajectory {
                id,
                reason: "timestamps decrease".into(),
            });
        }
        if timestamps.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(Error::InvalidTrajectory {
                id,
                reason: "timestamps must be finite and non-negative".into(),
            });
        }
        Ok(Self {
            id,
            path,
            timestamps,
        })
    }

    /// The `[first, last]` timestamp interval, if the trajectory is non-empty.
    pub fn activity_span(&self) -> Option<ActivitySpan> {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(&start), Some(&end)) => Some(ActivitySpan { start, end }),
            _ => None,
        }
    }
}

/// Precomputed per-time-unit counters, derived and never mutated externally.
///
/// For each integer unit `u` in `[0, ceil(max end)]`:
/// - `active[u]` = entities whose interval contains `u`
/// - `cumulative[u]` = entities whose start is `<= u` (non-decreasing)
///
/// `max_active` is floored at 1 so load fractions never divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    active: Vec<u32>,
    cumulative: Vec<u32>,
    max_active: u32,
}

impl AggregateTable {
    /// An empty table (no entities, no extent).
    pub fn empty() -> Self {
        Self {
            active: Vec::new(),
            cumulative: Vec::new(),
            max_active: 1,
        }
    }

    /// Build the table from entity activity spans.
    ///
    /// Spans with `end < start` or non-finite bounds are ignored; negative
    /// starts are clamped to 0.
    pub fn build(spans: &[ActivitySpan]) -> Self {
        let valid: Vec<ActivitySpan> = spans
            .iter()
            .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end >= s.start)
            .map(|s| ActivitySpan {
                start: s.start.max(0.0),
                end: s.end.max(0.0),
            })
            .collect();

        let max_end = valid.iter().fold(0.0_f64, |acc, s| acc.max(s.end));
        if valid.is_empty() {
            return Self::empty();
        }
        let units = max_end.ceil() as usize + 1;

        // Difference arrays: +1 where an interval begins covering integer
        // units, -1 one past where it stops.
        let mut active_diff = vec![0i64; units + 1];
        let mut cumulative_diff = vec![0i64; units + 1];
        for span in &valid {
            let first = span.start.ceil() as usize;
            let last = span.end.floor() as usize;
            cumulative_diff[first.min(units)] += 1;
            if first > last {
                // Interval contains no integer unit; it still counts toward
                // the cumulative total from `first` on.
                continue;
            }
            active_diff[first] += 1;
            active_diff[last + 1] -= 1;
        }

        let mut active = Vec::with_capacity(units);
        let mut cumulative = Vec::with_capacity(units);
        let mut active_acc = 0i64;
        let mut cumulative_acc = 0i64;
        for u in 0..units {
            active_acc += active_diff[u];
            cumulative_acc += cumulative_diff[u];
            active.push(active_acc as u32);
            cumulative.push(cumulative_acc as u32);
        }

        let max_active = active.iter().copied().max().unwrap_or(0).max(1);
        Self {
            active,
            cumulative,
            max_active,
        }
    }

    /// Build directly from trajectories, skipping empty ones.
    pub fn from_trajectories(trajectories: &[Trajectory]) -> Self {
        let spans: Vec<ActivitySpan> = trajectories
            .iter()
            .filter_map(Trajectory::activity_span)
            .collect();
        Self::build(&spans)
    }

    /// Number of time units covered (0 for an empty table).
    pub fn units(&self) -> usize {
        self.active.len()
    }

    /// Last integer unit in the table, if any.
    pub fn max_unit(&self) -> Option<usize> {
        self.units().checked_sub(1)
    }

    /// Active entity count at unit `u`; 0 past the table's end.
    pub fn active_at(&self, u: usize) -> u32 {
        self.active.get(u).copied().unwrap_or(0)
    }

    /// Cumulative entity count at unit `u`; saturates at the total past the end.
    pub fn cumulative_at(&self, u: usize) -> u32 {
        self.cumulative
            .get(u)
            .or(self.cumulative.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn max_active(&self) -> u32 {
        self.max_active
    }

    /// Normalized load at unit `u`, in `[0, 1]`.
    pub fn load_fraction_at(&self, u: usize) -> f64 {
        f64::from(self.active_at(u)) / f64::from(self.max_active)
    }
}

impl Default for AggregateTable {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Direct per-unit interval expansion: the behavioral oracle for `build`.
    fn naive_build(spans: &[ActivitySpan]) -> (Vec<u32>, Vec<u32>) {
        let valid: Vec<ActivitySpan> = spans
            .iter()
            .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end >= s.start)
            .map(|s| ActivitySpan::new(s.start.max(0.0), s.end.max(0.0)))
            .collect();
        let max_end = valid.iter().fold(0.0_f64, |acc, s| acc.max(s.end));
        if valid.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let units = max_end.ceil() as usize + 1;
        let mut active = vec![0u32; units];
        let mut cumulative = vec![0u32; units];
        for u in 0..units {
            let t = u as f64;
            for s in &valid {
                if s.start <= t && t <= s.end {
                    active[u] += 1;
                }
                if s.start <= t {
                    cumulative[u] += 1;
                }
            }
        }
        (active, cumulative)
    }

    #[test]
    fn test_two_overlapping_spans() {
        let table = AggregateTable::build(&[
            ActivitySpan::new(0.0, 10.0),
            ActivitySpan::new(5.0, 15.0),
        ]);
        assert_eq!(table.active_at(7), 2);
        assert_eq!(table.active_at(12), 1);
        assert_eq!(table.cumulative_at(5), 2);
        assert_eq!(table.cumulative_at(20), 2);
        assert_eq!(table.max_active(), 2);
        assert_eq!(table.max_unit(), Some(15));
    }

    #[test]
    fn test_cumulative_reaches_total_at_max_end() {
        let spans = [
            ActivitySpan::new(0.0, 3.0),
            ActivitySpan::new(1.5, 4.5),
            ActivitySpan::new(4.0, 9.0),
        ];
        let table = AggregateTable::build(&spans);
        let last = table.max_unit().unwrap();
        assert_eq!(table.cumulative_at(last), spans.len() as u32);
        // Non-decreasing throughout.
        for u in 1..=last {
            assert!(table.cumulative_at(u) >= table.cumulative_at(u - 1));
        }
    }

    #[test]
    fn test_empty_input() {
        let table = AggregateTable::build(&[]);
        assert_eq!(table.units(), 0);
        assert_eq!(table.active_at(0), 0);
        assert_eq!(table.cumulative_at(0), 0);
        // Floored at 1 so downstream load fractions never divide by zero.
        assert_eq!(table.max_active(), 1);
        assert_eq!(table.load_fraction_at(0), 0.0);
    }

    #[test]
    fn test_fractional_interval_with_no_integer_unit() {
        // [2.2, 2.8] covers no integer unit but still counts cumulatively.
        let table = AggregateTable::build(&[ActivitySpan::new(2.2, 2.8)]);
        assert_eq!(table.active_at(2), 0);
        assert_eq!(table.active_at(3), 0);
        assert_eq!(table.cumulative_at(3), 1);
        assert_eq!(table.cumulative_at(2), 0);
    }

    #[test]
    fn test_invalid_spans_ignored() {
        let table = AggregateTable::build(&[
            ActivitySpan::new(5.0, 2.0),
            ActivitySpan::new(f64::NAN, 4.0),
            ActivitySpan::new(0.0, 2.0),
        ]);
        assert_eq!(table.active_at(1), 1);
        assert_eq!(table.cumulative_at(2), 1);
    }

    #[test]
    fn test_trajectory_validation() {
        let p = |n: usize| vec![PathSample { x: 0.0, y: 0.0 }; n];
        assert!(Trajectory::new("uav-1", p(3), vec![0.0, 1.0, 2.0]).is_ok());
        assert!(Trajectory::new("uav-2", p(3), vec![0.0, 2.0, 1.0]).is_err());
        assert!(Trajectory::new("uav-3", p(2), vec![0.0]).is_err());
        assert!(Trajectory::new("uav-4", p(1), vec![-1.0]).is_err());
    }

    #[test]
    fn test_trajectory_span_and_table() {
        let traj = Trajectory::new(
            "uav-1",
            vec![PathSample { x: 0.0, y: 0.0 }, PathSample { x: 1.0, y: 1.0 }],
            vec![2.0, 6.5],
        )
        .unwrap();
        assert_eq!(traj.activity_span(), Some(ActivitySpan::new(2.0, 6.5)));
        let table = AggregateTable::from_trajectories(&[traj]);
        assert_eq!(table.active_at(4), 1);
        assert_eq!(table.active_at(7), 0);
    }

    proptest! {
        /// Difference-array construction matches per-unit expansion exactly.
        #[test]
        fn prop_matches_naive_expansion(
            raw in proptest::collection::vec((0.0f64..40.0, 0.0f64..20.0), 0..12)
        ) {
            let spans: Vec<ActivitySpan> = raw
                .iter()
                .map(|&(start, len)| ActivitySpan::new(start, start + len))
                .collect();
            let table = AggregateTable::build(&spans);
            let (active, cumulative) = naive_build(&spans);
            prop_assert_eq!(table.active.clone(), active);
            prop_assert_eq!(table.cumulative.clone(), cumulative);
        }
    }
}
