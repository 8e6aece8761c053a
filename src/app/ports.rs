//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService / CommandInterpreter (domain)
//! ```
//!
//! Driven adapters (probes, relays, event sinks, storage, the command
//! channel) implement these traits.  The domain consumes them via
//! generics, so the control core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **CommandChannel::poll** MUST return within its timeout; the control
//!   activity never waits on the network.
//! - All port errors are typed — callers must handle every variant explicitly.

use core::time::Duration;

use crate::app::events::AppEvent;
use crate::config::{Settings, SystemConfig};
use crate::control::clock::Instant;
use crate::error::ActuatorError;
use crate::sensors::ProbeReadings;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the sampling activity calls this every sample period.
pub trait SensorPort {
    /// Advance the probe conversion cycle.  Non-blocking.
    ///
    /// Returns `Some` when a fresh pair of readings completed; a failed
    /// probe is reported as the −127 °C sentinel, never as an error.
    fn poll(&mut self, now: Instant) -> Option<ProbeReadings>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the control activity drives the three relays.
/// Every method must be safe to call every tick with unchanged values.
pub trait ActuatorPort {
    fn set_heater(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Kill all actuators — safe shutdown.
    fn all_off(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists deployment configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: domain ↔ persisted user settings)
// ───────────────────────────────────────────────────────────────

/// Per-key persistence of the user-facing [`Settings`].
pub trait SettingsPort {
    /// Load every key.  A missing or unreadable key falls back to the
    /// matching field of `defaults`; never fails as a whole.
    fn load_settings(&self, defaults: Settings) -> Settings;

    /// Persist every key.
    fn save_settings(&self, settings: &Settings) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Command channel port (driving adapter: remote user → domain)
// ───────────────────────────────────────────────────────────────

/// Identifies the conversation a message came from; replies go back there.
pub type ChatId = i64;

/// One inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    /// Display name of the sender, if the transport knows it.
    pub sender: Option<String>,
    pub text: String,
}

/// Bounded-time inbound message source with addressed replies.
pub trait CommandChannel {
    /// Wait at most `timeout` for the next message.
    fn poll(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, ChannelError>;

    /// Send `text` to `chat_id`.
    fn reply(&mut self, chat_id: ChatId, text: &str) -> Result<(), ChannelError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic wrapping millisecond clock.
pub trait TimePort {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when an activity is due.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue.  The main loop implements this by forwarding to
/// [`push_event`](crate::events::push_event), but the scheduler itself
/// knows nothing about events or queues.
pub trait SchedulerDelegate {
    /// Called when the activity with `label` fires.
    fn on_schedule_fired(&mut self, label: &str);
}

/// Lets any `FnMut(&str)` act as a delegate.
impl<F: FnMut(&str)> SchedulerDelegate for F {
    fn on_schedule_fired(&mut self, label: &str) {
        self(label);
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from the settings store and its backing key-value storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored bytes could not be decoded.
    Corrupted,
}

/// Errors from [`CommandChannel`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The transport is not connected.
    Disconnected,
    /// The remote end rejected or failed the request.
    SendFailed,
    /// The inbound message could not be decoded.
    Malformed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl core::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "channel disconnected"),
            Self::SendFailed => write!(f, "send failed"),
            Self::Malformed => write!(f, "malformed message"),
        }
    }
}
