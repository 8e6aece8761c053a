//! DS18B20 digital thermometer on a 1-Wire bus.
//!
//! Only the subset needed for periodic polling: CONVERT T broadcast to every
//! probe, then READ SCRATCHPAD per probe once the conversion time has passed.
//! Power-on resolution (12 bit, 0.0625 °C, 750 ms) is left unchanged.

use core::fmt::Write;

use super::onewire::{OneWireBus, crc8};
use crate::error::SensorError;

// ── ROM / function commands ───────────────────────────────────

pub const CMD_SKIP_ROM: u8 = 0xCC;
pub const CMD_MATCH_ROM: u8 = 0x55;
pub const CMD_CONVERT_T: u8 = 0x44;
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// Family code of every DS18B20 ROM.
pub const FAMILY_CODE: u8 = 0x28;

/// Reading reported for a probe that could not be read.
pub const DISCONNECTED_C: f32 = -127.0;

/// Physical measurement range.
pub const MIN_C: f32 = -55.0;
pub const MAX_C: f32 = 125.0;

/// 64-bit ROM code: family, 48-bit serial, CRC.
pub type RomCode = [u8; 8];

/// `true` when the ROM code belongs to a DS18B20 and its CRC checks out.
pub fn rom_is_valid(rom: &RomCode) -> bool {
    rom[0] == FAMILY_CODE && crc8(rom) == 0
}

/// ROM code as 16 hex digits, family byte first.
pub fn rom_hex(rom: &RomCode) -> heapless::String<16> {
    let mut s = heapless::String::new();
    for b in rom {
        // 8 bytes × 2 digits fill the buffer exactly.
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Broadcast CONVERT T to every probe on the bus.
pub fn start_conversion<B: OneWireBus>(bus: &mut B) -> Result<(), SensorError> {
    bus.reset()?;
    bus.write_bytes(&[CMD_SKIP_ROM, CMD_CONVERT_T])
}

/// Read the last conversion result from one probe.
///
/// `rom = None` addresses the only device on the bus.
pub fn read_temperature<B: OneWireBus>(
    bus: &mut B,
    rom: Option<&RomCode>,
) -> Result<f32, SensorError> {
    bus.reset()?;
    match rom {
        Some(code) => {
            bus.write_byte(CMD_MATCH_ROM)?;
            bus.write_bytes(code)?;
        }
        None => bus.write_byte(CMD_SKIP_ROM)?,
    }
    bus.write_byte(CMD_READ_SCRATCHPAD)?;
    let mut scratchpad = [0u8; 9];
    bus.read_bytes(&mut scratchpad)?;
    decode_scratchpad(&scratchpad)
}

/// Decode the 9-byte scratchpad into °C.
pub fn decode_scratchpad(sp: &[u8; 9]) -> Result<f32, SensorError> {
    // An absent probe leaves the line floating high.
    if sp.iter().all(|&b| b == 0xFF) {
        return Err(SensorError::Disconnected);
    }
    // A shorted line reads all zeros, which also passes the CRC.
    if sp.iter().all(|&b| b == 0) {
        return Err(SensorError::BusFault);
    }
    if crc8(sp) != 0 {
        return Err(SensorError::CrcMismatch);
    }
    let raw = i16::from_le_bytes([sp[0], sp[1]]);
    let celsius = f32::from(raw) / 16.0;
    if !(MIN_C..=MAX_C).contains(&celsius) {
        return Err(SensorError::OutOfRange);
    }
    Ok(celsius)
}

/// Collapse a read result into the sentinel convention.
pub fn celsius_or_sentinel(reading: Result<f32, SensorError>) -> f32 {
    reading.unwrap_or(DISCONNECTED_C)
}
