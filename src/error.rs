//! Unified error types for the fermctl firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level error handling uniform.  All variants are `Copy` so they can
//! be carried through the control path without allocation.  Nothing in
//! the control loop propagates these: sensor errors become invalid
//! samples, actuator errors are logged and retried on the next tick.

use core::fmt;

pub use crate::app::ports::{ChannelError, ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A probe could not be read or returned implausible data.
    Sensor(SensorError),
    /// A relay output could not be driven.
    Actuator(ActuatorError),
    /// A command carried an unusable value.
    Command(CommandError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Key/value storage failed.
    Storage(StorageError),
    /// The command channel failed.
    Channel(ChannelError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No presence pulse after a 1-Wire reset (bus empty or shorted).
    NoPresence,
    /// The bus pin could not be driven or sampled.
    BusFault,
    /// Scratchpad CRC did not match.
    CrcMismatch,
    /// The probe reported the "disconnected" sentinel.
    Disconnected,
    /// Reading is outside the probe's physical range.
    OutOfRange,
    /// A conversion is still in progress.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPresence => write!(f, "no presence pulse"),
            Self::BusFault => write!(f, "1-Wire bus fault"),
            Self::CrcMismatch => write!(f, "scratchpad CRC mismatch"),
            Self::Disconnected => write!(f, "probe disconnected"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotReady => write!(f, "conversion in progress"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The text is not a decimal number.
    NotANumber,
    /// The number is NaN or infinite.
    NotFinite,
    /// The number is outside the probe range.
    OutOfRange,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "not a decimal number"),
            Self::NotFinite => write!(f, "value is not finite"),
            Self::OutOfRange => write!(f, "value outside -55..125 \u{00b0}C"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
