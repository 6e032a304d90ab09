//! Tickline replay engine.
//!
//! The engine behind the dashboard: it ingests an ordered stream of
//! timestamped records, maintains a bounded replay window plus a parallel
//! anomaly feed, keeps the two views mutually addressable by stable id, and
//! drives a virtual clock that animates time-indexed trajectories without
//! touching any rendering surface.
//!
//! Components, leaf-first:
//! - [`window`]: bounded FIFO ring buffer shared by all sequence views
//! - [`aggregate`]: per-time-unit active/cumulative counts from entity spans
//! - [`ingest`]: record parsing, id assignment, dual-track append
//! - [`correlate`]: id-based position lookup across the two views
//! - [`clock`]: the virtual playback clock state machine
//! - [`deadline`]: cancellable delayed tasks on a test-controllable clock
//! - [`bus`]: synchronous update fan-out to external renderers
//! - [`engine`]: the per-subscription instance tying it all together
//!
//! The binary entry point (a JSONL replay driver) is in `main.rs`.

pub mod aggregate;
pub mod bus;
pub mod clock;
pub mod correlate;
pub mod deadline;
pub mod engine;
pub mod ingest;
pub mod journal;
pub mod logging;
pub mod window;

pub use engine::{EngineConfig, EngineCounters, ReplayEngine};
