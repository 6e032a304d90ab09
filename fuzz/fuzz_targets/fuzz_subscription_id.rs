//! Fuzz target for subscription id parsing.
//!
//! Tests that id validation handles arbitrary strings without panicking,
//! including non-ASCII input where byte and char indexing disagree.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tl_common::id::SubscriptionId;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = SubscriptionId::parse(raw);
    }
});
