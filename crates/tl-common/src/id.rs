//! Tick and subscription identity types.
//!
//! A tick is identified by a monotonic sequence id assigned at ingest time.
//! The id is unique for the lifetime of one subscription and is the only
//! stable way to correlate a tick across the timeline window and the anomaly
//! feed, because positional indices shift on every eviction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, monotonic tick identifier.
///
/// Ids are assigned in arrival order, so within any window the sequence of
/// ids is strictly increasing and position lookups can binary-search on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(raw: u64) -> Self {
        TickId(raw)
    }
}

/// Allocator handing out the next monotonic [`TickId`].
///
/// One allocator per subscription; ids start at 1 so that 0 can never be
/// mistaken for a live id in logs.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TickIdAllocator {
    next: u64,
}

impl TickIdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate the next id. Never returns the same id twice.
    pub fn next_id(&mut self) -> TickId {
        self.next += 1;
        TickId(self.next)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// Subscription ID for one engine instance.
///
/// Format: `tl-YYYYMMDD-HHMMSS-XXXX`
/// Example: `tl-20260312-093015-k4mz`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    /// Generate a new subscription ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        SubscriptionId(format!(
            "tl-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }

    /// Parse an existing subscription ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 23 {
            return None;
        }
        let bytes = s.as_bytes();
        if bytes.first() != Some(&b't')
            || bytes.get(1) != Some(&b'l')
            || bytes.get(2) != Some(&b'-')
            || bytes.get(11) != Some(&b'-')
            || bytes.get(18) != Some(&b'-')
        {
            return None;
        }
        let date = &s[3..11];
        let time = &s[12..18];
        let suffix = &s[19..23];
        if !date.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')) {
            return None;
        }
        Some(SubscriptionId(s.to_string()))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four random characters from the lowercase base32 alphabet (a-z, 2-7).
fn generate_base32_suffix() -> String {
    const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";
    uuid::Uuid::new_v4().as_bytes()[..4]
        .iter()
        .map(|b| ALPHABET[(b & 0x1F) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_ids_monotonic() {
        let mut alloc = TickIdAllocator::new();
        let a = alloc.next_id();
        let b = alloc.next_id();
        let c = alloc.next_id();
        assert!(a < b && b < c);
        assert_eq!(alloc.issued(), 3);
    }

    #[test]
    fn test_tick_id_display() {
        assert_eq!(TickId(42).to_string(), "42");
    }

    #[test]
    fn test_subscription_id_format() {
        let sid = SubscriptionId::new();
        assert!(sid.0.starts_with("tl-"));
        assert_eq!(sid.0.len(), 23);
    }

    #[test]
    fn test_subscription_id_parse_roundtrip() {
        let sid = SubscriptionId::new();
        assert_eq!(SubscriptionId::parse(&sid.0), Some(sid));
    }

    #[test]
    fn test_subscription_id_parse_rejects_garbage() {
        assert_eq!(SubscriptionId::parse("xx-20260312-093015-k4mz"), None);
        assert_eq!(SubscriptionId::parse("tl-2026031-093015-k4mz"), None);
        assert_eq!(SubscriptionId::parse("tl-20260312-093015-K4MZ"), None);
        assert_eq!(SubscriptionId::parse(""), None);
    }
}
