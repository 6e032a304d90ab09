//! Wire record model for the incoming tick stream.
//!
//! The transport delivers one JSON record per tick. The engine parses and
//! validates it minimally: the candle fields must be finite numbers and the
//! timestamp must be present. Detection and attribution payloads are carried
//! opaquely; their semantic content is the detection collaborator's business.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One OHLCV candle, the payload of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// True when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Raw tick record as delivered by the detection collaborator.
///
/// `anomaly_details` and `detection_stats` are kept as opaque JSON: the
/// engine forwards them, it never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub has_anomaly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_stats: Option<Value>,
}

impl TickRecord {
    /// Parse one record from a JSON string, with minimal validation.
    ///
    /// Failures are reported as [`Error::ParseRejected`]; the stream is
    /// expected to continue past them.
    pub fn from_json(raw: &str) -> Result<Self> {
        let record: TickRecord =
            serde_json::from_str(raw).map_err(|e| Error::ParseRejected(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Minimal structural checks on an already-deserialized record.
    pub fn validate(&self) -> Result<()> {
        if self.timestamp.is_empty() {
            return Err(Error::ParseRejected("empty timestamp".into()));
        }
        if !self.candle().is_finite() {
            return Err(Error::ParseRejected(format!(
                "non-finite candle at {}",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// The OHLCV payload of this record.
    pub fn candle(&self) -> Candle {
        Candle {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Bounds applied to `set_speed` control values.
pub const MIN_PLAYBACK_SPEED: f64 = 0.1;
pub const MAX_PLAYBACK_SPEED: f64 = 10.0;

/// Playback control command from a UI or test driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlCommand {
    Pause,
    Resume,
    SetSpeed { value: f64 },
}

impl ControlCommand {
    /// Parse one control message from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The effective playback rate for this command, clamped to
    /// `[MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED]`.
    pub fn clamped_speed(value: f64) -> f64 {
        value.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
    }
}
