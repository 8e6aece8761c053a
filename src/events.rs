//! Runtime event queue.
//!
//! Events are produced by the scheduler delegate when a periodic activity
//! falls due, and consumed by the main loop one at a time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Scheduler   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ (delegate)  │     │ (bounded MPMC)│    │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The queue is an `embassy-sync` channel behind a critical-section
//! mutex, so producers in other tasks or ISRs can push safely.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Runtime events, one per periodic activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Poll the probes and publish into the sample store.
    SampleTick,
    /// Run one control tick and write the relays.
    ControlTick,
    /// Drain the command channel.
    CommandTick,
    /// Emit a telemetry snapshot.
    TelemetryTick,
}

impl Event {
    pub const ALL: [Event; 4] = [
        Event::SampleTick,
        Event::ControlTick,
        Event::CommandTick,
        Event::TelemetryTick,
    ];

    /// Scheduler slot label for this event.
    pub const fn label(self) -> &'static str {
        match self {
            Self::SampleTick => "sample",
            Self::ControlTick => "control",
            Self::CommandTick => "command",
            Self::TelemetryTick => "telemetry",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.label() == label)
    }
}

/// Bounded FIFO of [`Event`]s.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        self.channel.try_send(event).is_ok()
    }

    pub fn pop(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, FIFO.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ── Global queue ──────────────────────────────────────────────

static EVENTS: EventQueue = EventQueue::new();

/// Push an event into the global queue.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}

/// Pop the next event from the global queue.
pub fn pop_event() -> Option<Event> {
    EVENTS.pop()
}

/// Drain all pending events from the global queue.
pub fn drain_events(handler: impl FnMut(Event)) {
    EVENTS.drain(handler);
}

/// Number of pending events in the global queue.
pub fn queue_len() -> usize {
    EVENTS.len()
}
