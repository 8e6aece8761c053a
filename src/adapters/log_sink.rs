//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the device, stderr in the simulation).
//! Telemetry is additionally rendered as one JSON line so it can be
//! scraped off the serial console.

use log::{info, warn};

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

fn temp(c: Option<f32>, valid: bool) -> String {
    match (c, valid) {
        (Some(c), true) => format!("{c:.2}\u{00b0}C"),
        (Some(c), false) => format!("{c:.2}\u{00b0}C(stale)"),
        (None, _) => "--".into(),
    }
}

/// Telemetry as a single JSON object.
pub fn telemetry_json(t: &TelemetryData) -> Option<String> {
    serde_json::to_string(t).ok()
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | selected={} | mode={} | heat={} cool={} fan={} | \
                     chamber={} liquid={} | up={}s",
                    t.selected,
                    t.mode,
                    u8::from(t.actuators.heating),
                    u8::from(t.actuators.cooling),
                    u8::from(t.actuators.blowing),
                    temp(t.chamber_c, t.chamber_valid),
                    temp(t.liquid_c, t.liquid_valid),
                    t.uptime_secs,
                );
                if let Some(json) = telemetry_json(t) {
                    info!("TELEM-JSON | {}", json);
                }
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {} -> {}", from, to);
            }
            AppEvent::ActuatorsChanged { from, to } => {
                info!(
                    "RELAY | heat {}->{} cool {}->{} fan {}->{}",
                    u8::from(from.heating),
                    u8::from(to.heating),
                    u8::from(from.cooling),
                    u8::from(to.cooling),
                    u8::from(from.blowing),
                    u8::from(to.blowing),
                );
            }
            AppEvent::SelectedModeChanged(mode) => {
                info!("SETTINGS | selected mode {}", mode);
            }
            AppEvent::ThresholdChanged { which, value } => {
                info!("SETTINGS | {}={:.2}", which.key(), value);
            }
            AppEvent::ThresholdsOutOfOrder => {
                warn!("SETTINGS | thresholds out of order");
            }
            AppEvent::PersistFailed => {
                warn!("SETTINGS | not persisted");
            }
            AppEvent::Started(selected) => {
                info!("START | selected={}", selected);
            }
        }
    }
}
