//! Inbound command tokens.
//!
//! Matching is exact on the trimmed message text.  Anything that is not
//! a known token parses to `None` and is ignored without a reply.

use crate::config::{SelectedMode, Threshold};
use crate::error::CommandError;
use crate::sensors::ds18b20;

/// Direction of a one-step threshold adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Up,
    Down,
}

impl Step {
    /// Exactly one degree.
    pub const fn delta(self) -> f32 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

/// Commands understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Help listing.
    Start,
    Status,
    /// Both probe temperatures.
    GetTemp,
    GetChamberTemp,
    GetLiquidTemp,
    SetMode(SelectedMode),
    /// Arm a pending edit; the next message carries the value.
    EditThreshold(Threshold),
    /// Adjust a threshold by one degree.
    StepThreshold(Threshold, Step),
}

/// Command stem for a threshold, e.g. `/setTempHH`.
pub const fn threshold_stem(which: Threshold) -> &'static str {
    match which {
        Threshold::InnerHigh => "/setTempH",
        Threshold::OuterHigh => "/setTempHH",
        Threshold::InnerLow => "/setTempL",
        Threshold::OuterLow => "/setTempLL",
    }
}

/// Mode-selection token for a mode.
pub const fn mode_token(mode: SelectedMode) -> &'static str {
    match mode {
        SelectedMode::Off => "/setModeOff",
        SelectedMode::Auto => "/setModeAuto",
        SelectedMode::HeatOnly => "/setModeHeat",
        SelectedMode::CoolOnly => "/setModeCool",
    }
}

pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let cmd = match text {
        "/start" => Command::Start,
        "/status" => Command::Status,
        "/getTemp" => Command::GetTemp,
        "/getChamberTemp" => Command::GetChamberTemp,
        "/getLiquidTemp" => Command::GetLiquidTemp,
        _ => return parse_mode(text).or_else(|| parse_threshold(text)),
    };
    Some(cmd)
}

fn parse_mode(text: &str) -> Option<Command> {
    [
        SelectedMode::Off,
        SelectedMode::Auto,
        SelectedMode::HeatOnly,
        SelectedMode::CoolOnly,
    ]
    .into_iter()
    .find(|m| mode_token(*m) == text)
    .map(Command::SetMode)
}

fn parse_threshold(text: &str) -> Option<Command> {
    Threshold::ALL.into_iter().find_map(|which| {
        match text.strip_prefix(threshold_stem(which))? {
            "" => Some(Command::EditThreshold(which)),
            "p" => Some(Command::StepThreshold(which, Step::Up)),
            "m" => Some(Command::StepThreshold(which, Step::Down)),
            _ => None,
        }
    })
}

/// Parse a threshold value in °C.
///
/// Rejects anything that is not a finite decimal inside the probe range.
pub fn parse_celsius(text: &str) -> Result<f32, CommandError> {
    let value: f32 = text.trim().parse().map_err(|_| CommandError::NotANumber)?;
    check_celsius(value)
}

/// Range check shared by typed values and ±1 steps.
pub fn check_celsius(value: f32) -> Result<f32, CommandError> {
    if !value.is_finite() {
        return Err(CommandError::NotFinite);
    }
    if !(ds18b20::MIN_C..=ds18b20::MAX_C).contains(&value) {
        return Err(CommandError::OutOfRange);
    }
    Ok(value)
}
