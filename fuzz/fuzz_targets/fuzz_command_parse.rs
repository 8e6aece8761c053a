//! Fuzz target: command token and threshold value parsing
//!
//! Feeds arbitrary UTF-8 text to `parse_command` and `parse_celsius` and
//! asserts that neither panics and that every accepted value is a finite
//! temperature inside the probe range.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use fermctl::app::commands::{parse_celsius, parse_command};
use fermctl::sensors::ds18b20::{MAX_C, MIN_C};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if parse_command(text).is_some() {
        assert!(text.trim().starts_with('/'), "non-slash text parsed as command");
    }

    if let Ok(v) = parse_celsius(text) {
        assert!(v.is_finite());
        assert!((MIN_C..=MAX_C).contains(&v), "{v} outside probe range");
    }
});
