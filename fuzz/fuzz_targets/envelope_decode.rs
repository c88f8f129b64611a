//! Fuzz target for `Envelope::decode`
//!
//! Feeds arbitrary text as an envelope body to find panics in the JSON
//! classification path: unknown discriminants, mistyped payloads, and
//! one-versus-many fragment normalization.

#![no_main]

use libfuzzer_sys::fuzz_target;
use palaver_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Classification must degrade to an error, never a panic
        let _ = Envelope::decode(text);
    }
});
