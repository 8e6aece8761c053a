//! Control service — the hexagonal core of the control activity.
//!
//! [`ControlService`] owns the mode FSM and its context.  It exposes a
//! clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  SampleStore ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!   Settings   ──▶ │      ControlService       │
//! ActuatorPort ◀── │ FSM · hysteresis · timer  │ ──▶ ControlStatus
//!                  └──────────────────────────┘
//! ```

use core::time::Duration;

use log::{info, warn};

use crate::config::{Settings, SystemConfig};
use crate::control::clock::Instant;
use crate::control::timer::CompressorTimer;
use crate::fsm::context::{ActuatorState, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, OperatingMode};
use crate::sensors::{Sample, SampleStore};

use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, EventSink, SensorPort};
use super::shared::ControlStatus;

// ───────────────────────────────────────────────────────────────
// Sampling activity
// ───────────────────────────────────────────────────────────────

/// One sampling step: poll the probes and publish a completed pair.
/// Returns the new snapshot when one was published.
pub fn sample_tick(
    sensors: &mut impl SensorPort,
    store: &SampleStore,
    now: Instant,
) -> Option<Sample> {
    sensors.poll(now).map(|readings| store.publish(readings, now))
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

/// Orchestrates one control tick: settings + sample → FSM → actuators.
pub struct ControlService {
    fsm: Fsm,
    ctx: FsmContext,
    stale_after: Duration,
    actuator_faults: u32,
}

impl ControlService {
    /// Construct the service.  The compressor timer is anchored at `now`,
    /// so the compressor is held off for one rest interval after boot.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) next.
    pub fn new(config: &SystemConfig, settings: Settings, now: Instant) -> Self {
        let timer = CompressorTimer::new(now, config.compressor_rest(), config.fan_linger());
        let ctx = FsmContext::new(settings, timer);
        let fsm = Fsm::new(build_state_table(), OperatingMode::Undefined);
        Self {
            fsm,
            ctx,
            stale_after: config.sample_stale_after(),
            actuator_faults: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every output off and start the FSM in `Undefined`.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if let Err(e) = hw.all_off() {
            warn!("Initial all-off failed: {}", e);
        }
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.ctx.selected));
        info!("ControlService started, selected mode {}", self.ctx.selected);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle and return what was decided.
    pub fn tick(
        &mut self,
        settings: Settings,
        sample: &Sample,
        now: Instant,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> ControlStatus {
        let prev_mode = self.fsm.current_mode();
        let prev_actuators = self.ctx.actuators;

        // 1. Inputs
        let reference = sample.reference(now, self.stale_after);
        self.ctx.begin_tick(settings, reference, now);

        // 2. Mode transition + hysteresis
        self.fsm.tick(&mut self.ctx);

        // 3. Outputs
        self.apply_actuators(hw);

        // 4. Events
        let mode = self.fsm.current_mode();
        if mode != prev_mode {
            sink.emit(&AppEvent::ModeChanged {
                from: prev_mode,
                to: mode,
            });
        }
        if self.ctx.actuators != prev_actuators {
            sink.emit(&AppEvent::ActuatorsChanged {
                from: prev_actuators,
                to: self.ctx.actuators,
            });
        }

        self.status()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            mode: self.fsm.current_mode(),
            actuators: self.ctx.actuators,
        }
    }

    /// Build a telemetry snapshot.
    pub fn build_telemetry(&self, settings: &Settings, sample: &Sample, uptime_secs: u32) -> TelemetryData {
        TelemetryData {
            uptime_secs,
            selected: settings.selected,
            mode: self.fsm.current_mode(),
            actuators: self.ctx.actuators,
            chamber_c: sample.chamber.last_known(),
            liquid_c: sample.liquid.last_known(),
            chamber_valid: sample.chamber.valid,
            liquid_valid: sample.liquid.valid,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.fsm.current_mode()
    }

    pub fn actuators(&self) -> ActuatorState {
        self.ctx.actuators
    }

    /// Timestamp of the most recent heat/cool off event.
    pub fn last_off(&self) -> Instant {
        self.ctx.timer.last_off()
    }

    /// Failed actuator writes since startup.
    pub fn actuator_faults(&self) -> u32 {
        self.actuator_faults
    }

    // ── Internal ──────────────────────────────────────────────

    /// Write all three outputs, every tick.  A failed write is logged and
    /// retried on the next tick.
    fn apply_actuators(&mut self, hw: &mut impl ActuatorPort) {
        let a = self.ctx.actuators;
        let results = [
            ("heater", hw.set_heater(a.heating)),
            ("cooler", hw.set_cooler(a.cooling)),
            ("fan", hw.set_fan(a.blowing)),
        ];
        for (name, result) in results {
            if let Err(e) = result {
                self.actuator_faults = self.actuator_faults.saturating_add(1);
                warn!("Actuator {} write failed: {}", name, e);
            }
        }
    }
}
