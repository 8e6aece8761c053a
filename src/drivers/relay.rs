//! Relay output driver.
//!
//! A relay is a plain digital output with a configurable polarity.  Every
//! `set` writes the pin, even when the requested state is unchanged, so a
//! level disturbed by a brown-out is restored on the next control tick.
//! Only edges are logged.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIO via hw_init.
//! On host/test: hw_init records the level in memory.

use log::info;

use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins;

pub struct Relay {
    label: &'static str,
    gpio: i32,
    active_high: bool,
    energised: bool,
}

impl Relay {
    pub fn new(label: &'static str, gpio: i32, active_high: bool) -> Self {
        Self {
            label,
            gpio,
            active_high,
            energised: false,
        }
    }

    /// Drive the relay.  Idempotent.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        hw_init::gpio_write(self.gpio, on == self.active_high)
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        if on != self.energised {
            info!("{} {}", self.label, if on { "ON" } else { "OFF" });
        }
        self.energised = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.energised
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

/// The three relays of the chamber.
pub struct RelayBank {
    pub heater: Relay,
    pub cooler: Relay,
    pub fan: Relay,
}

impl RelayBank {
    /// Relays on the board pins from [`pins`].
    pub fn new(active_high: bool) -> Self {
        Self {
            heater: Relay::new("Heater", pins::HEATER_GPIO, active_high),
            cooler: Relay::new("Cooler", pins::COOLER_GPIO, active_high),
            fan: Relay::new("Fan", pins::FAN_GPIO, active_high),
        }
    }

    /// De-energise everything.  Attempts every relay even if one fails.
    pub fn all_off(&mut self) -> Result<(), ActuatorError> {
        let heater = self.heater.set(false);
        let cooler = self.cooler.set(false);
        let fan = self.fan.set(false);
        heater.and(cooler).and(fan)
    }
}
