//! Fuzz target for tick record parsing.
//!
//! Tests that wire record parsing handles arbitrary input without panicking.
//! Records arrive from an external feed and must never take the engine down.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tl_common::record::TickRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        // Should never panic, only return a parse rejection
        let _ = TickRecord::from_json(raw);
    }
});
