//! 32-bit millisecond monotonic timestamps.
//!
//! The ESP32 tick counter and the host uptime are both truncated to a
//! `u32` millisecond count, which wraps roughly every 49.7 days.  All
//! elapsed-time arithmetic goes through [`Instant::checked_duration_since`],
//! which uses wrapping subtraction so a single wrap is measured correctly.
//!
//! A difference larger than half the counter range is interpreted as the
//! "earlier" instant actually lying in the future (clock re-seeded, or a
//! stale anchor); callers get `None` and must re-anchor instead of reading
//! a bogus multi-week elapsed time.

use core::time::Duration;

/// Half of the `u32` range: the largest forward distance we accept.
const HALF_RANGE_MS: u32 = u32::MAX / 2;

/// A point on the 32-bit millisecond monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instant(u32);

impl Instant {
    /// Boot-time origin.
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Truncate a 64-bit microsecond uptime to the wrapping millisecond clock.
    pub const fn from_micros_u64(us: u64) -> Self {
        Self((us / 1000) as u32)
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, wraparound-safe.
    ///
    /// Returns `None` when `earlier` is ahead of `self`.
    pub fn checked_duration_since(self, earlier: Instant) -> Option<Duration> {
        let diff = self.0.wrapping_sub(earlier.0);
        if diff > HALF_RANGE_MS {
            None
        } else {
            Some(Duration::from_millis(u64::from(diff)))
        }
    }

    /// Time elapsed from `earlier` to `self`, saturating to zero when
    /// `earlier` is ahead of `self`.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        self.checked_duration_since(earlier).unwrap_or(Duration::ZERO)
    }

    /// `self + d`, wrapping around the counter range.
    pub fn wrapping_add(self, d: Duration) -> Instant {
        Self(self.0.wrapping_add(duration_to_ms(d)))
    }

    /// True if `self` is at or after `other` on the wrapping clock.
    pub fn is_at_or_after(self, other: Instant) -> bool {
        self.checked_duration_since(other).is_some()
    }
}

/// Clamp a `Duration` to the millisecond range the clock can express.
pub fn duration_to_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(HALF_RANGE_MS)) as u32
}
