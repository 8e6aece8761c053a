//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) and the
//! [`CommandInterpreter`](super::interpreter::CommandInterpreter) emit these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them.

use serde::Serialize;

use crate::config::{SelectedMode, Threshold};
use crate::fsm::OperatingMode;
use crate::fsm::context::ActuatorState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The operating mode changed.
    ModeChanged { from: OperatingMode, to: OperatingMode },

    /// At least one actuator changed state.
    ActuatorsChanged { from: ActuatorState, to: ActuatorState },

    /// The user changed the selected mode.
    SelectedModeChanged(SelectedMode),

    /// The user changed a threshold.
    ThresholdChanged { which: Threshold, value: f32 },

    /// Thresholds no longer satisfy `tempLL <= tempL <= tempH <= tempHH`.
    ThresholdsOutOfOrder,

    /// A settings mutation could not be persisted (still applied in memory).
    PersistFailed,

    /// The control service has started (carries the loaded settings).
    Started(SelectedMode),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryData {
    pub uptime_secs: u32,
    pub selected: SelectedMode,
    pub mode: OperatingMode,
    pub actuators: ActuatorState,
    pub chamber_c: Option<f32>,
    pub liquid_c: Option<f32>,
    pub chamber_valid: bool,
    pub liquid_valid: bool,
}
