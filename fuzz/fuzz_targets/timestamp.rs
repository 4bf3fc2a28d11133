//! Fuzz target for naive timestamp parsing.
//!
//! Any input must either fail with an error or parse to an instant that
//! formats back to a string the parser accepts again.

#![no_main]

use libfuzzer_sys::fuzz_target;

use analytics_core::{format_api_timestamp, parse_naive_timestamp, parse_range_bound};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(instant) = parse_naive_timestamp(input) {
        let rendered = format_api_timestamp(instant);
        assert_eq!(parse_naive_timestamp(&rendered).ok(), Some(instant));
    }
    let _ = parse_range_bound(input);
});
