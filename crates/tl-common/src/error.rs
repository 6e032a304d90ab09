//! Error types for the tickline engine.
//!
//! The engine is designed to keep ingesting and animating under transient
//! bad data, so almost every abnormal condition degrades to a defined no-op:
//! capacity eviction, an idle clock, a correlation miss, and an out-of-range
//! seek are all silent, specified behaviors and have no variants here.
//!
//! What remains is the small set of conditions a host may want to log or
//! count, each with a stable code and a structured JSON projection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for tickline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input on the tick stream or entity data.
    Ingest,
    /// Subscription lifecycle errors.
    Subscription,
    /// File I/O and serialization errors (driver-level).
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Ingest => write!(f, "ingest"),
            ErrorCategory::Subscription => write!(f, "subscription"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for tickline.
#[derive(Error, Debug)]
pub enum Error {
    // Ingest errors (10-19)
    #[error("record rejected: {0}")]
    ParseRejected(String),

    #[error("invalid trajectory {id}: {reason}")]
    InvalidTrajectory { id: String, reason: String },

    // Subscription errors (20-29)
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),

    // I/O errors (30-39)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error code, grouped by category.
    pub fn code(&self) -> u32 {
        match self {
            Error::ParseRejected(_) => 10,
            Error::InvalidTrajectory { .. } => 11,
            Error::SubscriptionClosed(_) => 20,
            Error::Io(_) => 30,
            Error::Json(_) => 31,
        }
    }

    /// Error category for grouping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ParseRejected(_) | Error::InvalidTrajectory { .. } => ErrorCategory::Ingest,
            Error::SubscriptionClosed(_) => ErrorCategory::Subscription,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the stream can simply continue past this error.
    ///
    /// A rejected record or trajectory is dropped and ingestion goes on;
    /// a closed subscription is terminal for that engine instance.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ParseRejected(_) => true,
            Error::InvalidTrajectory { .. } => true,
            Error::SubscriptionClosed(_) => false,
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,
    /// Error category for grouping.
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Whether the stream can continue past this error.
    pub recoverable: bool,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        }
    }
}

impl StructuredError {
    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
