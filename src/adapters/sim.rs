//! Host simulation of the chamber hardware.
//!
//! [`SimBus`] is a [`OneWireBus`] with two emulated DS18B20 probes whose
//! temperatures come from a first-order [`ThermalModel`] of the chamber.
//! The model is driven by the simulated relay outputs: it reads the
//! heater and cooler pin levels that [`RelayBank`](crate::drivers::relay::RelayBank)
//! writes through `hw_init`.  Plugged into the regular
//! [`HardwareAdapter`](super::hardware::HardwareAdapter), the whole probe and
//! relay path runs unchanged on a workstation.

use log::debug;

use crate::config::SystemConfig;
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::pins;
use crate::sensors::ds18b20::{self, RomCode};
use crate::sensors::onewire::{OneWireBus, crc8};

// ── Thermal model ─────────────────────────────────────────────

/// Lumped two-node model: chamber air and the liquid inside it.
#[derive(Debug, Clone, Copy)]
pub struct ThermalModel {
    pub ambient_c: f32,
    pub chamber_c: f32,
    pub liquid_c: f32,
    /// Heater power expressed as °C/s of chamber warming.
    pub heat_rate: f32,
    /// Cooler power expressed as °C/s of chamber cooling.
    pub cool_rate: f32,
    /// Chamber ↔ ambient time constant (s).
    pub tau_ambient: f32,
    /// Chamber ↔ liquid time constant (s).
    pub tau_liquid: f32,
}

impl ThermalModel {
    pub fn new(ambient_c: f32) -> Self {
        Self {
            ambient_c,
            chamber_c: ambient_c,
            liquid_c: ambient_c,
            heat_rate: 0.02,
            cool_rate: 0.03,
            tau_ambient: 1800.0,
            tau_liquid: 3600.0,
        }
    }

    /// Advance by `dt_secs` with the given outputs.
    pub fn step(&mut self, dt_secs: f32, heating: bool, cooling: bool) {
        let mut d_chamber = (self.ambient_c - self.chamber_c) / self.tau_ambient
            + (self.liquid_c - self.chamber_c) / self.tau_liquid;
        if heating {
            d_chamber += self.heat_rate;
        }
        if cooling {
            d_chamber -= self.cool_rate;
        }
        let d_liquid = (self.chamber_c - self.liquid_c) / self.tau_liquid;
        self.chamber_c += d_chamber * dt_secs;
        self.liquid_c += d_liquid * dt_secs;
    }
}

// ── Emulated probes ───────────────────────────────────────────

/// Build a valid DS18B20 ROM code with the given serial byte.
pub fn probe_rom(serial: u8) -> RomCode {
    let mut rom = [ds18b20::FAMILY_CODE, 0x53, 0x49, 0x4D, 0x00, 0x00, serial, 0x00];
    rom[7] = crc8(&rom[..7]);
    rom
}

/// 12-bit DS18B20 scratchpad for `celsius`.
pub fn scratchpad(celsius: f32) -> [u8; 9] {
    let raw = (celsius * 16.0).round() as i16;
    let [lsb, msb] = raw.to_le_bytes();
    let mut sp = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x00];
    sp[8] = crc8(&sp[..8]);
    sp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Chamber,
    Liquid,
    All,
    Nobody,
}

#[derive(Debug, Clone, Copy)]
enum BusState {
    Idle,
    AwaitRom,
    MatchRom { rom: RomCode, len: usize },
    AwaitFunction(Target),
    Reading { sp: [u8; 9], pos: usize },
}

/// 1-Wire bus with a chamber and a liquid probe.
pub struct SimBus {
    pub model: ThermalModel,
    chamber_rom: RomCode,
    liquid_rom: RomCode,
    relays_active_high: bool,
    /// Simulated seconds per wall-clock second.
    speedup: f32,
    last_step: std::time::Instant,
    latched: (f32, f32),
    state: BusState,
    /// When `false` the liquid probe does not answer.
    pub liquid_present: bool,
}

impl SimBus {
    pub fn new(model: ThermalModel, relays_active_high: bool, speedup: f32) -> Self {
        Self {
            latched: (model.chamber_c, model.liquid_c),
            model,
            chamber_rom: probe_rom(1),
            liquid_rom: probe_rom(2),
            relays_active_high,
            speedup,
            last_step: std::time::Instant::now(),
            state: BusState::Idle,
            liquid_present: true,
        }
    }

    pub fn chamber_rom(&self) -> RomCode {
        self.chamber_rom
    }

    pub fn liquid_rom(&self) -> RomCode {
        self.liquid_rom
    }

    /// Point the probe configuration at the emulated probes.
    pub fn install_roms(&self, config: &mut SystemConfig) {
        config.chamber_probe_rom = Some(self.chamber_rom);
        config.liquid_probe_rom = Some(self.liquid_rom);
    }

    fn output_on(&self, gpio: i32) -> bool {
        hw_init::sim_level(gpio).is_some_and(|high| high == self.relays_active_high)
    }

    /// CONVERT T: advance the model to now and latch both readings.
    fn convert(&mut self) {
        let now = std::time::Instant::now();
        let dt = now.duration_since(self.last_step).as_secs_f32() * self.speedup;
        self.last_step = now;
        let heating = self.output_on(pins::HEATER_GPIO);
        let cooling = self.output_on(pins::COOLER_GPIO);
        self.model.step(dt, heating, cooling);
        self.latched = (self.model.chamber_c, self.model.liquid_c);
        debug!(
            "SIM | chamber={:.2} liquid={:.2} heat={} cool={}",
            self.latched.0, self.latched.1, heating, cooling
        );
    }

    fn function(&mut self, target: Target, cmd: u8) -> BusState {
        match (cmd, target) {
            (ds18b20::CMD_CONVERT_T, _) => {
                self.convert();
                BusState::Idle
            }
            (ds18b20::CMD_READ_SCRATCHPAD, Target::Chamber | Target::All) => BusState::Reading {
                sp: scratchpad(self.latched.0),
                pos: 0,
            },
            (ds18b20::CMD_READ_SCRATCHPAD, Target::Liquid) => BusState::Reading {
                sp: scratchpad(self.latched.1),
                pos: 0,
            },
            _ => BusState::Idle,
        }
    }
}

impl OneWireBus for SimBus {
    fn reset(&mut self) -> Result<(), SensorError> {
        self.state = BusState::AwaitRom;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        self.state = match self.state {
            BusState::AwaitRom if byte == ds18b20::CMD_SKIP_ROM => BusState::AwaitFunction(Target::All),
            BusState::AwaitRom if byte == ds18b20::CMD_MATCH_ROM => BusState::MatchRom {
                rom: [0; 8],
                len: 0,
            },
            BusState::MatchRom { mut rom, len } => {
                rom[len] = byte;
                if len + 1 < rom.len() {
                    BusState::MatchRom { rom, len: len + 1 }
                } else if rom == self.chamber_rom {
                    BusState::AwaitFunction(Target::Chamber)
                } else if rom == self.liquid_rom && self.liquid_present {
                    BusState::AwaitFunction(Target::Liquid)
                } else {
                    BusState::AwaitFunction(Target::Nobody)
                }
            }
            BusState::AwaitFunction(target) => self.function(target, byte),
            _ => BusState::Idle,
        };
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        // An unanswered read floats high.
        let BusState::Reading { sp, pos } = self.state else {
            return Ok(0xFF);
        };
        self.state = if pos + 1 < sp.len() {
            BusState::Reading { sp, pos: pos + 1 }
        } else {
            BusState::Idle
        };
        Ok(sp[pos])
    }
}
