//! Fuzz target for playback control message parsing.
//!
//! Control messages come from a UI over the wire; parsing must handle
//! arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tl_common::record::ControlCommand;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = ControlCommand::from_json(raw);
    }
});
