//! Human-readable replies: status report, temperature readouts, help.

use core::fmt::Write;

use crate::app::commands::{mode_token, threshold_stem};
use crate::app::shared::ControlStatus;
use crate::config::{SelectedMode, Settings, Threshold};
use crate::sensors::{ProbeSample, Sample};

const DEGREES: &str = "\u{00b0}C";

fn on_off(on: bool) -> &'static str {
    if on { "On" } else { "Off" }
}

/// `20.50°C`, `20.50°C (last good reading)` or `no reading`.
fn probe_text(probe: &ProbeSample) -> String {
    match (probe.valid, probe.last_known()) {
        (true, Some(c)) => format!("{c:.2}{DEGREES}"),
        (false, Some(c)) => format!("{c:.2}{DEGREES} (last good reading)"),
        _ => "no reading".into(),
    }
}

pub fn chamber_line(sample: &Sample) -> String {
    format!("Chamber temperature: {}", probe_text(&sample.chamber))
}

pub fn liquid_line(sample: &Sample) -> String {
    format!("Liquid temperature: {}", probe_text(&sample.liquid))
}

/// Both probes, one per line.
pub fn temperatures_text(sample: &Sample) -> String {
    format!("{}\n{}", chamber_line(sample), liquid_line(sample))
}

/// Warning appended when the thresholds are not in their intended order.
pub const ORDER_WARNING: &str =
    "Warning: thresholds out of order (expected tempLL <= tempL <= tempH <= tempHH)";

/// Full status report.
pub fn status_text(settings: &Settings, status: &ControlStatus, sample: &Sample) -> String {
    let mut out = String::with_capacity(512);
    let _ = writeln!(out, "Selected mode: {}", settings.selected);
    let _ = writeln!(out, "Operating mode: {}", status.mode);
    let _ = writeln!(out, "Fan: {}", on_off(status.actuators.blowing));
    let _ = writeln!(out, "Cooler: {}", on_off(status.actuators.cooling));
    let _ = writeln!(out, "Heater: {}", on_off(status.actuators.heating));
    let _ = writeln!(out, "{}", chamber_line(sample));
    let _ = writeln!(out, "{}", liquid_line(sample));
    for which in [
        Threshold::InnerHigh,
        Threshold::InnerLow,
        Threshold::OuterHigh,
        Threshold::OuterLow,
    ] {
        let _ = writeln!(
            out,
            "{}: {:.2}{DEGREES}",
            which.label(),
            settings.thresholds.get(which)
        );
    }
    if !settings.thresholds.is_ordered() {
        let _ = writeln!(out, "{ORDER_WARNING}");
    }
    out
}

/// Confirmation for a changed threshold.
pub fn threshold_text(which: Threshold, value: f32) -> String {
    format!("{} set to {value:.2}{DEGREES}", which.label())
}

/// Confirmation for a changed mode.
pub fn mode_text(mode: SelectedMode) -> String {
    format!("Selected mode: {mode}")
}

/// Prompt after a bare `/setTemp*`.
pub fn prompt_text(which: Threshold, current: f32) -> String {
    format!(
        "{} is {current:.2}{DEGREES}. Send the new value in {DEGREES}.",
        which.label()
    )
}

/// `/start` help listing.  `sender` falls back to "Guest".
pub fn help_text(sender: Option<&str>) -> String {
    let name = sender.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Guest");
    let mut out = String::with_capacity(768);
    let _ = writeln!(out, "Hello, {name}.");
    let _ = writeln!(out, "This bot controls the fermentation chamber.\n");
    let _ = writeln!(
        out,
        "{} : heat or cool as needed",
        mode_token(SelectedMode::Auto)
    );
    let _ = writeln!(out, "{} : cooling only", mode_token(SelectedMode::CoolOnly));
    let _ = writeln!(out, "{} : heating only", mode_token(SelectedMode::HeatOnly));
    let _ = writeln!(out, "{} : everything off", mode_token(SelectedMode::Off));
    let _ = writeln!(out, "/getTemp : all probe temperatures");
    let _ = writeln!(out, "/getChamberTemp : chamber temperature");
    let _ = writeln!(out, "/getLiquidTemp : liquid temperature");
    let _ = writeln!(out, "/status : full system status");
    for which in Threshold::ALL {
        let stem = threshold_stem(which);
        let _ = writeln!(
            out,
            "{stem} : set {} ({stem}p / {stem}m: +1 / -1 {DEGREES})",
            which.label().to_lowercase()
        );
    }
    out
}
