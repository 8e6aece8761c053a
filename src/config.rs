//! System configuration parameters
//!
//! Two layers:
//!
//! - [`Settings`] — what the user changes at runtime over the command
//!   channel: the selected mode and the four hysteresis thresholds.
//!   Persisted key-by-key on every change.
//! - [`SystemConfig`] — deployment tunables (periods, protection
//!   intervals, relay polarity).  Persisted as one blob, rarely touched.

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Selected mode
// ---------------------------------------------------------------------------

/// Operating request chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelectedMode {
    /// Everything de-energised.
    Off = 0,
    /// Heat or cool as needed, switching on the outer thresholds.
    Auto = 1,
    /// Heating only.
    HeatOnly = 2,
    /// Cooling only.
    CoolOnly = 3,
}

impl SelectedMode {
    /// Decode the persisted integer.  Unknown values yield `None`.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Auto),
            2 => Some(Self::HeatOnly),
            3 => Some(Self::CoolOnly),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Auto => "Automatic",
            Self::HeatOnly => "Heating only",
            Self::CoolOnly => "Cooling only",
        }
    }
}

impl fmt::Display for SelectedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Identifies one of the four thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// `tempH` — upper hysteresis bound.
    InnerHigh,
    /// `tempHH` — upper mode-change bound.
    OuterHigh,
    /// `tempL` — lower hysteresis bound.
    InnerLow,
    /// `tempLL` — lower mode-change bound.
    OuterLow,
}

impl Threshold {
    pub const ALL: [Threshold; 4] = [
        Threshold::InnerHigh,
        Threshold::OuterHigh,
        Threshold::InnerLow,
        Threshold::OuterLow,
    ];

    /// Persistence key (also the command stem after `/set`).
    pub const fn key(self) -> &'static str {
        match self {
            Self::InnerHigh => "tempH",
            Self::OuterHigh => "tempHH",
            Self::InnerLow => "tempL",
            Self::OuterLow => "tempLL",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InnerHigh => "Upper hysteresis temperature",
            Self::OuterHigh => "Upper mode-change temperature",
            Self::InnerLow => "Lower hysteresis temperature",
            Self::OuterLow => "Lower mode-change temperature",
        }
    }
}

/// The four calibration values defining the hysteresis bands (°C).
///
/// Intended ordering: `outer_low <= inner_low <= inner_high <= outer_high`.
/// Any combination is representable; [`is_ordered`](Self::is_ordered)
/// reports whether the intended ordering holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub inner_high: f32,
    pub outer_high: f32,
    pub inner_low: f32,
    pub outer_low: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::FACTORY
    }
}

impl ThresholdConfig {
    pub const FACTORY: Self = Self {
        inner_high: 22.0,
        outer_high: 23.0,
        inner_low: 18.0,
        outer_low: 17.0,
    };

    pub fn get(&self, which: Threshold) -> f32 {
        match which {
            Threshold::InnerHigh => self.inner_high,
            Threshold::OuterHigh => self.outer_high,
            Threshold::InnerLow => self.inner_low,
            Threshold::OuterLow => self.outer_low,
        }
    }

    pub fn set(&mut self, which: Threshold, value: f32) {
        match which {
            Threshold::InnerHigh => self.inner_high = value,
            Threshold::OuterHigh => self.outer_high = value,
            Threshold::InnerLow => self.inner_low = value,
            Threshold::OuterLow => self.outer_low = value,
        }
    }

    /// `true` when `outer_low <= inner_low <= inner_high <= outer_high`.
    /// Any NaN makes this `false`.
    pub fn is_ordered(&self) -> bool {
        self.outer_low <= self.inner_low
            && self.inner_low <= self.inner_high
            && self.inner_high <= self.outer_high
    }
}

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// User-mutable, persisted control settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub selected: SelectedMode,
    pub thresholds: ThresholdConfig,
}

impl Settings {
    /// Factory thresholds, everything off.
    pub const FACTORY: Self = Self::with_mode(SelectedMode::Off);

    /// Factory settings with the given default mode.
    pub const fn with_mode(selected: SelectedMode) -> Self {
        Self {
            selected,
            thresholds: ThresholdConfig::FACTORY,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_mode(SystemConfig::default().default_mode)
    }
}

// ---------------------------------------------------------------------------
// Deployment tunables
// ---------------------------------------------------------------------------

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Probe sampling period (milliseconds)
    pub sample_period_ms: u32,
    /// Control loop period (milliseconds)
    pub control_period_ms: u32,
    /// Command channel polling period (milliseconds)
    pub command_period_ms: u32,
    /// Upper bound for one command channel poll (milliseconds)
    pub command_poll_timeout_ms: u32,
    /// Maximum inbound messages handled per command poll
    pub max_commands_per_poll: u8,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,

    // --- Protection ---
    /// Minimum compressor rest after an off event (seconds)
    pub compressor_rest_secs: u32,
    /// Fan run-on after heating/cooling stops (seconds)
    pub fan_linger_secs: u32,
    /// How long a last-known-good sample may stand in for failed reads
    /// (milliseconds)
    pub sample_stale_after_ms: u32,

    // --- Probes ---
    /// DS18B20 conversion time at 12-bit resolution (milliseconds)
    pub conversion_time_ms: u32,
    /// ROM code of the chamber probe.  `None`: the chamber probe is the
    /// only device on the bus and is addressed with SKIP ROM.
    pub chamber_probe_rom: Option<[u8; 8]>,
    /// ROM code of the liquid probe.  `None`: no liquid probe fitted.
    pub liquid_probe_rom: Option<[u8; 8]>,

    // --- Behaviour ---
    /// Selected mode used when nothing is persisted yet
    pub default_mode: SelectedMode,
    /// Relay outputs energise on a HIGH level
    pub relays_active_high: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            sample_period_ms: 250,
            control_period_ms: 500,
            command_period_ms: 1000,
            command_poll_timeout_ms: 200,
            max_commands_per_poll: 8,
            telemetry_interval_secs: 60,

            // Protection
            compressor_rest_secs: 120,
            fan_linger_secs: 300,
            sample_stale_after_ms: 30_000,

            // Probes
            conversion_time_ms: 750,
            chamber_probe_rom: None,
            liquid_probe_rom: None,

            // Behaviour
            default_mode: SelectedMode::Off,
            relays_active_high: true,
        }
    }
}

impl SystemConfig {
    pub fn compressor_rest(&self) -> Duration {
        Duration::from_secs(u64::from(self.compressor_rest_secs))
    }

    pub fn fan_linger(&self) -> Duration {
        Duration::from_secs(u64::from(self.fan_linger_secs))
    }

    pub fn sample_stale_after(&self) -> Duration {
        Duration::from_millis(u64::from(self.sample_stale_after_ms))
    }

    pub fn conversion_time(&self) -> Duration {
        Duration::from_millis(u64::from(self.conversion_time_ms))
    }

    pub fn command_poll_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.command_poll_timeout_ms))
    }
}
