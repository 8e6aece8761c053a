//! Fuzz target: `ds18b20::decode_scratchpad`
//!
//! Any 9 bytes off the bus must decode to either an error or a finite
//! temperature inside the probe range; a CRC-valid garbage scratchpad
//! must never leak a bogus reading into control.
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use fermctl::sensors::ds18b20::{MAX_C, MIN_C, decode_scratchpad};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: [u8; 9]| {
    if let Ok(c) = decode_scratchpad(&data) {
        assert!(c.is_finite());
        assert!((MIN_C..=MAX_C).contains(&c), "{c} outside probe range");
        assert!(data.iter().any(|&b| b != 0), "shorted bus decoded as {c}");
    }
});
