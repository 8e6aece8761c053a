//! State shared between the control and command activities.
//!
//! The command activity writes [`Settings`]; the control activity reads
//! them at the start of every tick and publishes a [`ControlStatus`] at
//! the end.  Both sides exchange whole copies under a critical-section
//! mutex, so a reader never sees a half-applied update.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::Serialize;

use crate::config::Settings;
use crate::fsm::OperatingMode;
use crate::fsm::context::ActuatorState;

/// What the control activity decided on its last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    pub mode: OperatingMode,
    pub actuators: ActuatorState,
}

impl ControlStatus {
    pub const IDLE: Self = Self {
        mode: OperatingMode::Undefined,
        actuators: ActuatorState {
            heating: false,
            cooling: false,
            blowing: false,
        },
    };
}

pub struct SharedState {
    settings: Mutex<CriticalSectionRawMutex, Cell<Settings>>,
    status: Mutex<CriticalSectionRawMutex, Cell<ControlStatus>>,
}

impl SharedState {
    pub const fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Cell::new(settings)),
            status: Mutex::new(Cell::new(ControlStatus::IDLE)),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock(|cell| cell.get())
    }

    pub fn set_settings(&self, settings: Settings) {
        self.settings.lock(|cell| cell.set(settings));
    }

    /// Read-modify-write under one lock; returns the new value.
    pub fn update_settings(&self, f: impl FnOnce(&mut Settings)) -> Settings {
        self.settings.lock(|cell| {
            let mut s = cell.get();
            f(&mut s);
            cell.set(s);
            s
        })
    }

    pub fn status(&self) -> ControlStatus {
        self.status.lock(|cell| cell.get())
    }

    pub fn publish_status(&self, status: ControlStatus) {
        self.status.lock(|cell| cell.set(status));
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
