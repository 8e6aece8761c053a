//! Mock adapters for integration tests.
//!
//! Records every actuator call, command-channel reply and emitted event so
//! tests can assert on the full history without touching real GPIO, NVS
//! or a network transport.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use fermctl::app::events::AppEvent;
use fermctl::app::ports::{
    ActuatorPort, ChannelError, ChatId, CommandChannel, EventSink, InboundMessage, SensorPort,
    SettingsPort, StorageError, TimePort,
};
use fermctl::config::Settings;
use fermctl::control::clock::Instant;
use fermctl::error::ActuatorError;
use fermctl::sensors::ProbeReadings;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Heater(bool),
    Cooler(bool),
    Fan(bool),
    AllOff,
}

// ── MockActuators ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockActuators {
    pub calls: Vec<ActuatorCall>,
    pub heater: bool,
    pub cooler: bool,
    pub fan: bool,
    /// When set, every write to the cooler fails.
    pub fail_cooler: bool,
}

#[allow(dead_code)]
impl MockActuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(heater, cooler, fan)` as last driven.
    pub fn outputs(&self) -> (bool, bool, bool) {
        (self.heater, self.cooler, self.fan)
    }

    /// Number of OFF→ON edges driven on the cooler.
    pub fn cooler_starts(&self) -> usize {
        let mut on = false;
        let mut starts = 0;
        for call in &self.calls {
            match call {
                ActuatorCall::Cooler(true) if !on => {
                    on = true;
                    starts += 1;
                }
                ActuatorCall::Cooler(false) | ActuatorCall::AllOff => on = false,
                _ => {}
            }
        }
        starts
    }
}

impl ActuatorPort for MockActuators {
    fn set_heater(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Heater(on));
        self.heater = on;
        Ok(())
    }

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Cooler(on));
        if self.fail_cooler {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.cooler = on;
        Ok(())
    }

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Fan(on));
        self.fan = on;
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::AllOff);
        self.heater = false;
        self.cooler = false;
        self.fan = false;
        Ok(())
    }
}

// ── MockSensors ───────────────────────────────────────────────

/// Returns queued readings, one per poll.
#[derive(Default)]
pub struct MockSensors {
    pub queue: VecDeque<ProbeReadings>,
    pub polls: usize,
}

#[allow(dead_code)]
impl MockSensors {
    pub fn push(&mut self, chamber_c: f32, liquid_c: f32) {
        self.queue.push_back(ProbeReadings { chamber_c, liquid_c });
    }
}

impl SensorPort for MockSensors {
    fn poll(&mut self, _now: Instant) -> Option<ProbeReadings> {
        self.polls += 1;
        self.queue.pop_front()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockSettings ──────────────────────────────────────────────

/// Settings store that remembers the last save and can be told to fail.
#[derive(Default)]
pub struct MockSettings {
    pub saved: RefCell<Option<Settings>>,
    pub saves: Cell<usize>,
    pub fail: Cell<bool>,
}

impl SettingsPort for MockSettings {
    fn load_settings(&self, defaults: Settings) -> Settings {
        self.saved.borrow().unwrap_or(defaults)
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        if self.fail.get() {
            return Err(StorageError::IoError);
        }
        self.saves.set(self.saves.get() + 1);
        *self.saved.borrow_mut() = Some(*settings);
        Ok(())
    }
}

// ── MockChannel ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockChannel {
    pub inbox: VecDeque<InboundMessage>,
    pub replies: Vec<(ChatId, String)>,
    /// Timeouts passed to each poll, in order.
    pub poll_timeouts: Vec<Duration>,
    pub fail_poll: bool,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, chat_id: ChatId, text: &str) {
        self.inbox.push_back(InboundMessage {
            chat_id,
            sender: Some("Ana".into()),
            text: text.into(),
        });
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.replies.last().map(|(_, t)| t.as_str())
    }
}

impl CommandChannel for MockChannel {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, ChannelError> {
        self.poll_timeouts.push(timeout);
        if self.fail_poll {
            return Err(ChannelError::Disconnected);
        }
        Ok(self.inbox.pop_front())
    }

    fn reply(&mut self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        self.replies.push((chat_id, text.to_string()));
        Ok(())
    }
}

// ── ManualClock ───────────────────────────────────────────────

/// Clock advanced explicitly by the test.
pub struct ManualClock {
    now: Cell<Instant>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u32) -> Self {
        Self {
            now: Cell::new(Instant::from_millis(ms)),
        }
    }

    pub fn advance(&self, d: Duration) -> Instant {
        let next = self.now.get().wrapping_add(d);
        self.now.set(next);
        next
    }

    pub fn advance_secs(&self, secs: u64) -> Instant {
        self.advance(Duration::from_secs(secs))
    }
}

impl TimePort for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
