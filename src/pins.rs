//! GPIO pin assignments for the fermentation chamber controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Relay outputs (polarity set by `SystemConfig::relays_active_high`)
// ---------------------------------------------------------------------------

/// Heater relay.
pub const HEATER_GPIO: i32 = 25;
/// Compressor relay.
pub const COOLER_GPIO: i32 = 26;
/// Circulation fan relay.
pub const FAN_GPIO: i32 = 27;

/// Every relay output, in bank order.
pub const RELAY_GPIOS: [i32; 3] = [HEATER_GPIO, COOLER_GPIO, FAN_GPIO];

// ---------------------------------------------------------------------------
// 1-Wire bus (DS18B20 probes, external 4.7 kΩ pull-up)
// ---------------------------------------------------------------------------

/// Open-drain data line shared by the chamber and liquid probes.
pub const ONEWIRE_GPIO: i32 = 4;

/// Highest GPIO number on the ESP32.
pub const MAX_GPIO: i32 = 39;
