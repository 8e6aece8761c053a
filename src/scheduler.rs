//! Periodic activity scheduler.
//!
//! The firmware runs four periodic activities off one loop: probe
//! sampling, the control tick, command polling and telemetry.  The
//! scheduler notifies a [`SchedulerDelegate`] when an activity falls due;
//! the main loop implements the delegate to push events into the queue.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Periodic activities                      │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐   │
//! │  │ sample    │  │ control   │  │ command   │  │telemetry │   │
//! │  │ 250 ms    │  │ 500 ms    │  │ 1000 ms   │  │ 60 s     │   │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬────┘   │
//! │        │              │              │              │        │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  │       (main loop pushes into Event Queue)              │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          │                                   │
//! │                          ▼                                   │
//! │        sample_tick · ControlService.tick · interpreter       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Due times live on the wrapping millisecond clock.  A stalled loop fires
//! each overdue activity once and then re-anchors it one period after
//! `now`, so a long stall never produces a burst of catch-up ticks.

use core::time::Duration;

use log::{info, warn};

use crate::app::ports::SchedulerDelegate;
use crate::control::clock::Instant;

// ═══════════════════════════════════════════════════════════════
//  Activity types
// ═══════════════════════════════════════════════════════════════

/// A periodic activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    /// Label passed to the delegate (e.g. "control").
    pub label: &'static str,
    /// Interval between firings.  Must be non-zero.
    pub period: Duration,
    /// Offset of the first firing from the time the activity is added.
    pub phase: Duration,
}

impl Activity {
    /// An activity that first fires immediately.
    pub const fn every(label: &'static str, period: Duration) -> Self {
        Self {
            label,
            period,
            phase: Duration::ZERO,
        }
    }

    pub const fn with_phase(mut self, phase: Duration) -> Self {
        self.phase = phase;
        self
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent activities (stack-allocated).
const MAX_ACTIVITIES: usize = 4;

/// Internal bookkeeping for a live activity.
#[derive(Debug, Clone, Copy)]
struct Slot {
    activity: Activity,
    next_due: Instant,
}

/// The scheduler engine.
///
/// Decoupled from the event system: when an activity fires it invokes
/// the [`SchedulerDelegate`] callback rather than pushing events itself.
pub struct Scheduler {
    slots: [Option<Slot>; MAX_ACTIVITIES],
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_ACTIVITIES],
        }
    }

    /// Add an activity, first due at `now + phase`.  Returns the slot
    /// index, or `None` if all slots are taken or the period is zero.
    pub fn add(&mut self, activity: Activity, now: Instant) -> Option<usize> {
        if activity.period.is_zero() {
            warn!("Scheduler: '{}' rejected, zero period", activity.label);
            return None;
        }
        let (i, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_none())?;
        info!(
            "Scheduler: added '{}' at slot {} (every {} ms)",
            activity.label,
            i,
            activity.period.as_millis()
        );
        *slot = Some(Slot {
            activity,
            next_due: now.wrapping_add(activity.phase),
        });
        Some(i)
    }

    /// Fire every activity that is due at `now`, each at most once.
    pub fn tick(&mut self, now: Instant, delegate: &mut dyn SchedulerDelegate) {
        for slot in self.slots.iter_mut().flatten() {
            let period = slot.activity.period;

            match slot.next_due.checked_duration_since(now) {
                // Not due yet.  An anchor more than one period ahead cannot
                // come from normal stepping; the clock moved under us.
                Some(ahead) if !ahead.is_zero() => {
                    if ahead > period {
                        warn!("Scheduler: '{}' re-anchored", slot.activity.label);
                        slot.next_due = now.wrapping_add(period);
                    }
                    continue;
                }
                _ => {}
            }

            delegate.on_schedule_fired(slot.activity.label);

            let next = slot.next_due.wrapping_add(period);
            slot.next_due = if next.checked_duration_since(now).is_some_and(|d| !d.is_zero()) {
                next
            } else {
                // More than a period behind: skip the missed firings.
                now.wrapping_add(period)
            };
        }
    }

    /// Time until the earliest due activity; zero if one is already due,
    /// `None` when nothing is scheduled.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.slots
            .iter()
            .flatten()
            .map(|s| s.next_due.checked_duration_since(now).unwrap_or(Duration::ZERO))
            .min()
    }

    /// Number of registered activities.
    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
