//! Timing primitives for the control loop: the wrapping millisecond clock
//! and the compressor restart / fan linger timer.

pub mod clock;
pub mod timer;
