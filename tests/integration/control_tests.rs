//! Integration tests for the sample store → ControlService → actuators
//! pipeline, driven by a manual clock.

use std::time::Duration;

use fermctl::app::events::AppEvent;
use fermctl::app::ports::TimePort;
use fermctl::app::service::{ControlService, sample_tick};
use fermctl::app::shared::ControlStatus;
use fermctl::config::{SelectedMode, Settings, SystemConfig};
use fermctl::events::{Event, EventQueue};
use fermctl::fsm::OperatingMode;
use fermctl::scheduler::{Activity, Scheduler};
use fermctl::sensors::{ProbeReadings, SampleStore};

use crate::mock_hw::{ActuatorCall, ManualClock, MockActuators, MockSensors, RecordingSink};

const CONTROL_STEP: Duration = Duration::from_millis(500);

struct Chamber {
    svc: ControlService,
    hw: MockActuators,
    sink: RecordingSink,
    store: SampleStore,
    clock: ManualClock,
    settings: Settings,
}

impl Chamber {
    fn new(mode: SelectedMode) -> Self {
        let clock = ManualClock::at(0);
        let settings = Settings::with_mode(mode);
        let mut svc = ControlService::new(&SystemConfig::default(), settings, clock.now());
        let mut hw = MockActuators::new();
        let mut sink = RecordingSink::new();
        svc.start(&mut hw, &mut sink);
        Self {
            svc,
            hw,
            sink,
            store: SampleStore::new(),
            clock,
            settings,
        }
    }

    /// Past the boot-time compressor rest, idling in band.
    fn rested(mode: SelectedMode) -> Self {
        let mut c = Self::new(mode);
        c.run_secs(121, 20.0);
        c
    }

    fn feed(&mut self, chamber_c: f32) {
        self.store.publish(
            ProbeReadings {
                chamber_c,
                liquid_c: 19.0,
            },
            self.clock.now(),
        );
    }

    fn tick(&mut self) -> ControlStatus {
        let sample = self.store.snapshot();
        self.svc.tick(
            self.settings,
            &sample,
            self.clock.now(),
            &mut self.hw,
            &mut self.sink,
        )
    }

    /// Feed and tick once.
    fn step(&mut self, chamber_c: f32) -> ControlStatus {
        self.clock.advance(CONTROL_STEP);
        self.feed(chamber_c);
        self.tick()
    }

    /// Run control ticks for `secs` seconds at a constant temperature.
    fn run_secs(&mut self, secs: u64, chamber_c: f32) -> ControlStatus {
        let mut status = self.tick();
        for _ in 0..secs * 2 {
            status = self.step(chamber_c);
        }
        status
    }
}

// ── Automatic mode cooling cycle ─────────────────────────────

#[test]
fn auto_cooling_cycle_with_fan_linger() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    assert_eq!(c.svc.mode(), OperatingMode::Undefined);

    let s = c.step(24.0);
    assert_eq!(s.mode, OperatingMode::Cooling);
    assert!(s.actuators.cooling && s.actuators.blowing);
    assert!(!s.actuators.heating);
    assert_eq!(c.hw.outputs(), (false, true, true));

    let s = c.step(17.5);
    let off_at = c.clock.now();
    assert_eq!(s.mode, OperatingMode::Cooling);
    assert!(!s.actuators.cooling, "cooler stops below tempL");
    assert!(s.actuators.blowing, "fan keeps running");
    assert_eq!(c.svc.last_off(), off_at);

    let s = c.run_secs(299, 17.5);
    assert!(s.actuators.blowing, "fan lingers for the full interval");

    let s = c.run_secs(2, 17.5);
    assert!(!s.actuators.blowing, "fan stops after the linger interval");
    assert_eq!(c.hw.outputs(), (false, false, false));
}

#[test]
fn cool_only_far_below_band_never_cools() {
    let mut c = Chamber::rested(SelectedMode::CoolOnly);
    let s = c.run_secs(600, 10.0);
    assert_eq!(s.mode, OperatingMode::Cooling);
    assert!(!s.actuators.any_on());
    assert_eq!(c.hw.cooler_starts(), 0);
}

#[test]
fn heat_only_heats_below_band() {
    let mut c = Chamber::rested(SelectedMode::HeatOnly);
    let s = c.step(17.9);
    assert_eq!(s.mode, OperatingMode::Heating);
    assert!(s.actuators.heating && s.actuators.blowing);

    let s = c.step(22.1);
    assert!(!s.actuators.heating, "heater stops above tempH");
    assert!(s.actuators.blowing);
}

// ── Compressor protection ────────────────────────────────────

#[test]
fn compressor_held_off_after_boot() {
    let mut c = Chamber::new(SelectedMode::Auto);
    let s = c.run_secs(60, 24.0);
    assert_eq!(s.mode, OperatingMode::Cooling);
    assert!(!s.actuators.cooling, "no start inside the boot rest interval");

    let s = c.run_secs(61, 24.0);
    assert!(s.actuators.cooling);
    assert_eq!(c.hw.cooler_starts(), 1);
}

#[test]
fn restart_waits_for_rest_interval() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.step(24.0);
    c.step(17.5);
    assert_eq!(c.hw.cooler_starts(), 1);

    let s = c.run_secs(60, 24.0);
    assert!(!s.actuators.cooling, "still resting");

    let s = c.run_secs(61, 24.0);
    assert!(s.actuators.cooling);
    assert_eq!(c.hw.cooler_starts(), 2);
}

#[test]
fn heater_is_not_rest_gated() {
    let mut c = Chamber::new(SelectedMode::Auto);
    let s = c.step(16.0);
    assert_eq!(s.mode, OperatingMode::Heating);
    assert!(s.actuators.heating, "heater starts immediately after boot");
}

#[test]
fn switching_to_heating_stops_the_compressor() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.step(24.0);
    assert!(c.hw.cooler);

    let s = c.step(16.5);
    assert_eq!(s.mode, OperatingMode::Heating);
    assert!(!s.actuators.cooling);
    assert!(s.actuators.heating);
    assert_eq!(c.svc.last_off(), c.clock.now());
}

// ── Selected mode Off ────────────────────────────────────────

#[test]
fn off_drops_every_output() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.step(24.0);
    assert!(c.hw.cooler);

    c.settings.selected = SelectedMode::Off;
    let s = c.step(24.0);
    assert_eq!(s, ControlStatus::IDLE);
    assert_eq!(c.hw.outputs(), (false, false, false));
    assert_eq!(c.svc.last_off(), c.clock.now(), "compressor stop is an off event");

    let s = c.run_secs(30, 30.0);
    assert_eq!(s, ControlStatus::IDLE);
}

// ── Sample staleness ─────────────────────────────────────────

#[test]
fn last_good_sample_holds_for_the_stale_window() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.step(24.0);
    assert!(c.hw.cooler);

    // Probe drops out: last good reading still drives control.
    for _ in 0..40 {
        c.clock.advance(CONTROL_STEP);
        c.store.publish(ProbeReadings::DISCONNECTED, c.clock.now());
        c.tick();
    }
    assert_eq!(c.svc.mode(), OperatingMode::Cooling);
    assert!(c.hw.cooler);

    // Past 30 s without a good read: no reference, outputs drop.
    for _ in 0..30 {
        c.clock.advance(CONTROL_STEP);
        c.store.publish(ProbeReadings::DISCONNECTED, c.clock.now());
        c.tick();
    }
    assert_eq!(c.svc.mode(), OperatingMode::Undefined);
    assert!(!c.hw.cooler);
    assert!(c.hw.fan, "fan lingers after a forced compressor stop");
}

#[test]
fn no_sample_ever_stays_idle() {
    let mut c = Chamber::new(SelectedMode::CoolOnly);
    for _ in 0..10 {
        c.clock.advance(CONTROL_STEP);
        let s = c.tick();
        assert_eq!(s, ControlStatus::IDLE);
    }
}

// ── Events and faults ────────────────────────────────────────

#[test]
fn transitions_are_reported_once() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.step(24.0);
    c.step(24.0);
    c.step(24.0);
    let mode_changes = c.sink.count(|e| {
        matches!(
            e,
            AppEvent::ModeChanged {
                from: OperatingMode::Undefined,
                to: OperatingMode::Cooling
            }
        )
    });
    assert_eq!(mode_changes, 1);
    assert_eq!(
        c.sink.count(|e| matches!(e, AppEvent::ActuatorsChanged { .. })),
        1
    );
    assert!(matches!(c.sink.events[0], AppEvent::Started(SelectedMode::Auto)));
}

#[test]
fn outputs_are_rewritten_every_tick() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.hw.calls.clear();
    c.step(20.0);
    c.step(20.0);
    assert_eq!(
        c.hw.calls,
        vec![
            ActuatorCall::Heater(false),
            ActuatorCall::Cooler(false),
            ActuatorCall::Fan(false),
            ActuatorCall::Heater(false),
            ActuatorCall::Cooler(false),
            ActuatorCall::Fan(false),
        ]
    );
}

#[test]
fn actuator_failure_is_counted_not_fatal() {
    let mut c = Chamber::rested(SelectedMode::Auto);
    c.hw.fail_cooler = true;
    let s = c.step(24.0);
    assert!(s.actuators.cooling, "decision stands, write retried next tick");
    c.step(24.0);
    assert_eq!(c.svc.actuator_faults(), 2);
}

// ── Sampling activity ────────────────────────────────────────

#[test]
fn sample_tick_publishes_completed_pairs_only() {
    let store = SampleStore::new();
    let mut sensors = MockSensors::default();
    let clock = ManualClock::at(1_000);

    assert!(sample_tick(&mut sensors, &store, clock.now()).is_none());
    assert!(!store.snapshot().chamber.valid);

    sensors.push(21.5, 20.0);
    let s = sample_tick(&mut sensors, &store, clock.now()).unwrap();
    assert_eq!(s.chamber.last_known(), Some(21.5));
    assert_eq!(store.snapshot(), s);
}

// ── Whole runtime on a manual clock ──────────────────────────

#[test]
fn scheduler_drives_all_activities() {
    let config = SystemConfig::default();
    let clock = ManualClock::at(0);
    let queue = EventQueue::new();
    let mut sched = Scheduler::new();
    for (event, period_ms) in [
        (Event::SampleTick, config.sample_period_ms),
        (Event::ControlTick, config.control_period_ms),
        (Event::CommandTick, config.command_period_ms),
    ] {
        sched.add(
            Activity::every(event.label(), Duration::from_millis(u64::from(period_ms))),
            clock.now(),
        );
    }
    let mut push = |label: &str| {
        if let Some(e) = Event::from_label(label) {
            assert!(queue.push(e));
        }
    };

    let store = SampleStore::new();
    let mut sensors = MockSensors::default();
    let mut hw = MockActuators::new();
    let mut sink = RecordingSink::new();
    let mut svc = ControlService::new(&config, Settings::with_mode(SelectedMode::Auto), clock.now());
    svc.start(&mut hw, &mut sink);

    let (mut samples, mut controls, mut commands) = (0, 0, 0);
    for _ in 0..(10_000 / 50) {
        sensors.push(16.0, 16.0);
        sched.tick(clock.now(), &mut push);
        queue.drain(|event| match event {
            Event::SampleTick => {
                samples += 1;
                sample_tick(&mut sensors, &store, clock.now());
            }
            Event::ControlTick => {
                controls += 1;
                svc.tick(
                    Settings::with_mode(SelectedMode::Auto),
                    &store.snapshot(),
                    clock.now(),
                    &mut hw,
                    &mut sink,
                );
            }
            Event::CommandTick => commands += 1,
            Event::TelemetryTick => {}
        });
        clock.advance(Duration::from_millis(50));
    }

    assert_eq!(samples, 40);
    assert_eq!(controls, 20);
    assert_eq!(commands, 10);
    assert_eq!(svc.mode(), OperatingMode::Heating);
    assert!(hw.heater);
}
