//! Fuzz target for `BrokerFrame::decode`
//!
//! Feeds arbitrary text to the frame codec to find parser panics, bad
//! escape handling, or header/body boundary confusion.
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use palaver_proto::BrokerFrame;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // This should never panic, only return Err for invalid data
        let _ = BrokerFrame::decode(text);
    }
});
