//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`ProbeHub`] and the [`RelayBank`], exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets the relays
//! write the simulated GPIO bank and the bus is typically a
//! [`SimBus`](super::sim::SimBus).

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::clock::Instant;
use crate::drivers::relay::RelayBank;
use crate::error::ActuatorError;
use crate::sensors::onewire::OneWireBus;
use crate::sensors::{ProbeHub, ProbeReadings};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<B> {
    probes: ProbeHub<B>,
    relays: RelayBank,
}

impl<B: OneWireBus> HardwareAdapter<B> {
    pub fn new(probes: ProbeHub<B>, relays: RelayBank) -> Self {
        Self { probes, relays }
    }

    pub fn relays(&self) -> &RelayBank {
        &self.relays
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<B: OneWireBus> SensorPort for HardwareAdapter<B> {
    fn poll(&mut self, now: Instant) -> Option<ProbeReadings> {
        self.probes.poll(now)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<B: OneWireBus> ActuatorPort for HardwareAdapter<B> {
    fn set_heater(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.heater.set(on)
    }

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.cooler.set(on)
    }

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.relays.fan.set(on)
    }

    fn all_off(&mut self) -> Result<(), ActuatorError> {
        self.relays.all_off()
    }
}
