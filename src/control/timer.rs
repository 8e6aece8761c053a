//! Compressor short-cycle protection and fan linger timing.
//!
//! A single anchor, `last_off`, is moved every time the heater or the
//! compressor is switched off (and when a mode switch forces one off).
//! Two gates are derived from the time elapsed since that anchor:
//!
//! | Gate           | Condition                     | Nominal |
//! |----------------|-------------------------------|---------|
//! | `can_restart`  | elapsed > compressor rest     | 120 s   |
//! | `can_stop_fan` | elapsed > fan linger          | 300 s   |
//!
//! Once elapsed passes the longer of the two intervals the gates are
//! latched open until the next off event, so a compressor that stays off
//! for weeks never trips over the 32-bit clock's half-range limit.

use core::time::Duration;

use super::clock::Instant;
use log::debug;

/// The two derived booleans consumed by the hysteresis handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerGates {
    /// The compressor has rested long enough to be restarted.
    pub can_restart: bool,
    /// The fan has lingered long enough to be stopped.
    pub can_stop_fan: bool,
}

/// Tracks the time since the last heat/cool "off" event.
#[derive(Debug, Clone)]
pub struct CompressorTimer {
    last_off: Instant,
    restart_after: Duration,
    fan_linger: Duration,
    /// Both gates open; no need to keep measuring until the next off event.
    settled: bool,
}

impl CompressorTimer {
    /// Start the timer anchored at `now`.  The compressor is therefore
    /// protected for one full rest interval after boot.
    pub fn new(now: Instant, restart_after: Duration, fan_linger: Duration) -> Self {
        Self {
            last_off: now,
            restart_after,
            fan_linger,
            settled: false,
        }
    }

    /// Record an off event (start of a protected interval).
    pub fn mark_off(&mut self, now: Instant) {
        debug!("timer: off event at {} ms", now.as_millis());
        self.last_off = now;
        self.settled = false;
    }

    /// Time since the last off event.
    ///
    /// If `now` reads as earlier than the anchor the anchor is moved to
    /// `now`, so the reading restarts from zero instead of jumping ahead.
    pub fn elapsed(&mut self, now: Instant) -> Duration {
        if let Some(d) = now.checked_duration_since(self.last_off) {
            d
        } else {
            debug!(
                "timer: clock reads {} ms before anchor {} ms, re-anchoring",
                now.as_millis(),
                self.last_off.as_millis()
            );
            self.last_off = now;
            Duration::ZERO
        }
    }

    /// Evaluate both gates at `now`.
    pub fn gates(&mut self, now: Instant) -> TimerGates {
        if self.settled {
            return TimerGates {
                can_restart: true,
                can_stop_fan: true,
            };
        }
        let elapsed = self.elapsed(now);
        let gates = TimerGates {
            can_restart: elapsed > self.restart_after,
            can_stop_fan: elapsed > self.fan_linger,
        };
        if gates.can_restart && gates.can_stop_fan {
            self.settled = true;
        }
        gates
    }

    /// Timestamp of the most recent off event.
    pub fn last_off(&self) -> Instant {
        self.last_off
    }
}
