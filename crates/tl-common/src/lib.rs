//! Tickline shared types.
//!
//! Types used across the workspace:
//! - Stable identity for ticks and subscriptions
//! - The wire record model for the incoming tick stream
//! - The error taxonomy and its structured JSON projection

pub mod error;
pub mod id;
pub mod record;

pub use error::{Error, Result};
pub use id::{SubscriptionId, TickId, TickIdAllocator};
pub use record::{Candle, ControlCommand, TickRecord};
