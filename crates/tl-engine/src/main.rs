//! `tickline`: JSONL replay driver for the tickline engine.
//!
//! Reads one JSON document per line from stdin: tick records, or control
//! messages discriminated by an `action` key (`pause`/`resume`/`set_speed`).
//! Each accepted record steps the virtual clock, and every update event the
//! engine emits is printed as one JSON line on stdout. Logs go to stderr.
//!
//! Example:
//! ```text
//! cat scenario.jsonl | tickline --span 0:120 --span 30:200 --autostart
//! ```

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tl_common::error::{Error, Result, StructuredError};
use tl_common::record::ControlCommand;
use tl_engine::aggregate::ActivitySpan;
use tl_engine::bus::{UpdateEvent, UpdateSink};
use tl_engine::engine::{EngineConfig, ReplayEngine};
use tl_engine::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "tickline", about = "Replay a JSONL tick stream through the correlation engine")]
struct Cli {
    /// Timeline window capacity.
    #[arg(long, default_value_t = 200)]
    timeline_capacity: usize,

    /// Anomaly feed capacity.
    #[arg(long, default_value_t = 100)]
    feed_capacity: usize,

    /// Start the clock playing immediately.
    #[arg(long)]
    autostart: bool,

    /// Initial playback rate multiplier.
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Clock advance per ingested record, in scenario time units.
    #[arg(long, default_value_t = 1.0)]
    step: f64,

    /// Virtual milliseconds between records (drives highlight expiry).
    #[arg(long, default_value_t = 250)]
    step_ms: u64,

    /// Entity activity span, `start:end`, repeatable.
    #[arg(long = "span", value_parser = parse_span)]
    spans: Vec<ActivitySpan>,

    /// Log level (also TL_LOG).
    #[arg(long, env = "TL_LOG")]
    log_level: Option<LogLevel>,

    /// Log format (also TL_LOG_FORMAT).
    #[arg(long, env = "TL_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

/// A line is a control message only when it carries a top-level `action`
/// key. Tick records may mention "action" inside their opaque payloads;
/// those still route to ingest.
fn is_control_line(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(|v| v.get("action").is_some())
        .unwrap_or(false)
}

fn parse_span(raw: &str) -> std::result::Result<ActivitySpan, String> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected start:end, got {raw}"))?;
    let start: f64 = start.parse().map_err(|e| format!("bad span start: {e}"))?;
    let end: f64 = end.parse().map_err(|e| format!("bad span end: {e}"))?;
    if end < start {
        return Err(format!("span end {end} precedes start {start}"));
    }
    Ok(ActivitySpan::new(start, end))
}

/// Prints every update event as one JSON line on stdout.
struct JsonlStdout;

impl UpdateSink for JsonlStdout {
    fn on_update(&self, event: &UpdateEvent) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", event.to_jsonl());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env(cli.log_level, cli.log_format));

    let engine = ReplayEngine::new(
        EngineConfig::default()
            .with_capacities(cli.timeline_capacity, cli.feed_capacity)
            .with_autostart(cli.autostart)
            .with_rate(cli.rate),
    );
    engine.subscribe(Arc::new(JsonlStdout));
    if !cli.spans.is_empty() {
        engine.set_activity_spans(&cli.spans)?;
    }
    info!(subscription = %engine.subscription_id(), "replay started");

    let stdin = io::stdin();
    let mut now_ms = 0u64;
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_control_line(trimmed) {
            match ControlCommand::from_json(trimmed) {
                Ok(command) => engine.apply_control(command)?,
                Err(err) => warn!(error = %err, "control message rejected"),
            }
            continue;
        }

        match engine.ingest_json(trimmed) {
            Ok(_) => {}
            Err(err @ Error::ParseRejected(_)) => {
                // Reported and dropped; the stream keeps going.
                eprintln!("{}", StructuredError::from(&err).to_json());
                continue;
            }
            Err(err) => return Err(err),
        }

        now_ms += cli.step_ms;
        engine.advance_to(now_ms)?;
        engine.step(cli.step)?;
    }

    let counters = engine.counters()?;
    info!(
        ticks = counters.ticks_ingested,
        anomalies = counters.anomalies_detected,
        rejected = counters.parse_errors,
        "replay finished"
    );
    engine.close();
    Ok(())
}
