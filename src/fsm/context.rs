//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the settings in force for this tick, the reference
//! temperature (if usable), the actuator states carried across ticks,
//! and the compressor timer.  It is owned by the control activity and
//! only ever borrowed mutably by the tick.

use serde::Serialize;

use crate::config::{SelectedMode, Settings, ThresholdConfig};
use crate::control::clock::Instant;
use crate::control::timer::{CompressorTimer, TimerGates};

// ---------------------------------------------------------------------------
// Actuator state (written by state handlers; consumed by the sequencer)
// ---------------------------------------------------------------------------

/// Desired state of the three binary actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActuatorState {
    /// Heater energised.
    pub heating: bool,
    /// Compressor energised.
    pub cooling: bool,
    /// Circulation fan energised.
    pub blowing: bool,
}

impl ActuatorState {
    /// All actuators off — safe default.
    pub fn all_off() -> Self {
        Self::default()
    }

    pub fn any_on(&self) -> bool {
        self.heating || self.cooling || self.blowing
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Inputs for this tick --
    /// Mode the user asked for.
    pub selected: SelectedMode,
    /// Hysteresis thresholds in force.
    pub thresholds: ThresholdConfig,
    /// Chamber temperature, `None` when no usable sample exists.
    pub reference_c: Option<f32>,
    /// Current timestamp.
    pub now: Instant,
    /// Timer gates sampled at the start of the tick.
    pub gates: TimerGates,

    // -- State carried across ticks --
    /// Actuator outputs decided so far.
    pub actuators: ActuatorState,
    /// Compressor rest / fan linger timer.
    pub timer: CompressorTimer,
}

impl FsmContext {
    pub fn new(settings: Settings, timer: CompressorTimer) -> Self {
        let now = timer.last_off();
        Self {
            selected: settings.selected,
            thresholds: settings.thresholds,
            reference_c: None,
            now,
            gates: TimerGates::default(),
            actuators: ActuatorState::all_off(),
            timer,
        }
    }

    /// Load this tick's inputs and sample the timer gates.
    pub fn begin_tick(&mut self, settings: Settings, reference_c: Option<f32>, now: Instant) {
        self.selected = settings.selected;
        self.thresholds = settings.thresholds;
        self.reference_c = reference_c;
        self.now = now;
        self.gates = self.timer.gates(now);
    }

    /// Record a heat/cool "off" event at the current tick time.
    /// Both gates close again for the rest of this tick.
    pub fn mark_off(&mut self) {
        self.timer.mark_off(self.now);
        self.gates = TimerGates::default();
    }

    /// Turn the fan off if it is on and the linger interval has passed.
    pub fn release_fan_if_lingered(&mut self) {
        if self.actuators.blowing && self.gates.can_stop_fan {
            self.actuators.blowing = false;
        }
    }
}
