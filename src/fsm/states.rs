//! Concrete mode handlers and table builder.
//!
//! Mode decisions (`on_update`) only look at the selected mode and the
//! outer thresholds.  Actuator switching (`regulate`) only looks at the
//! inner thresholds and the timer gates.
//!
//! ```text
//!  Auto:
//!    UNDEFINED ──[ref > tempHH]──▶ COOLING
//!    UNDEFINED ──[ref < tempLL]──▶ HEATING
//!    HEATING   ──[ref > tempHH]──▶ COOLING
//!    COOLING   ──[ref < tempLL]──▶ HEATING
//!
//!  HeatOnly: any ──▶ HEATING        CoolOnly: any ──▶ COOLING
//! ```
//!
//! Comparisons are strict, so a NaN reference or NaN threshold never
//! switches anything.

use super::context::FsmContext;
use super::{OperatingMode, StateDescriptor};
use crate::config::SelectedMode;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; OperatingMode::COUNT] {
    [
        // Index 0 — Undefined
        StateDescriptor {
            id: OperatingMode::Undefined,
            name: "Undefined",
            on_enter: Some(undefined_enter),
            on_exit: None,
            on_update: undefined_update,
            regulate: undefined_regulate,
        },
        // Index 1 — Heating
        StateDescriptor {
            id: OperatingMode::Heating,
            name: "Heating",
            on_enter: None,
            on_exit: Some(heating_exit),
            on_update: heating_update,
            regulate: heating_regulate,
        },
        // Index 2 — Cooling
        StateDescriptor {
            id: OperatingMode::Cooling,
            name: "Cooling",
            on_enter: Some(cooling_enter),
            on_exit: Some(cooling_exit),
            on_update: cooling_update,
            regulate: cooling_regulate,
        },
    ]
}

/// The reference temperature, or NaN when absent (NaN compares false).
fn reference(ctx: &FsmContext) -> f32 {
    ctx.reference_c.unwrap_or(f32::NAN)
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNDEFINED — waiting for a decision, nothing energised but the fan
// ═══════════════════════════════════════════════════════════════════════════

fn undefined_enter(ctx: &mut FsmContext) {
    debug!("Undefined: selected {}", ctx.selected);
}

fn undefined_update(ctx: &mut FsmContext) -> Option<OperatingMode> {
    match ctx.selected {
        SelectedMode::Auto => {
            let t = reference(ctx);
            if t > ctx.thresholds.outer_high {
                Some(OperatingMode::Cooling)
            } else if t < ctx.thresholds.outer_low {
                Some(OperatingMode::Heating)
            } else {
                None
            }
        }
        SelectedMode::HeatOnly => Some(OperatingMode::Heating),
        SelectedMode::CoolOnly => Some(OperatingMode::Cooling),
        SelectedMode::Off => None,
    }
}

fn undefined_regulate(ctx: &mut FsmContext) {
    ctx.actuators.heating = false;
    if ctx.actuators.cooling {
        ctx.actuators.cooling = false;
        ctx.mark_off();
    }
    ctx.release_fan_if_lingered();
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEATING
// ═══════════════════════════════════════════════════════════════════════════

fn heating_exit(ctx: &mut FsmContext) {
    if ctx.actuators.heating {
        ctx.actuators.heating = false;
        ctx.mark_off();
    }
}

fn heating_update(ctx: &mut FsmContext) -> Option<OperatingMode> {
    match ctx.selected {
        SelectedMode::Auto if reference(ctx) > ctx.thresholds.outer_high => {
            Some(OperatingMode::Cooling)
        }
        SelectedMode::CoolOnly => Some(OperatingMode::Cooling),
        _ => None,
    }
}

fn heating_regulate(ctx: &mut FsmContext) {
    let t = reference(ctx);
    if ctx.actuators.heating {
        if t > ctx.thresholds.inner_high {
            info!("Heater off at {t:.2} C");
            ctx.actuators.heating = false;
            ctx.mark_off();
        }
    } else if t < ctx.thresholds.inner_low {
        info!("Heater on at {t:.2} C");
        ctx.actuators.heating = true;
        ctx.actuators.blowing = true;
    } else {
        ctx.release_fan_if_lingered();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING — compressor restarts are gated by the rest interval
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_enter(ctx: &mut FsmContext) {
    if !ctx.gates.can_restart {
        debug!("Cooling: compressor resting since {} ms", ctx.timer.last_off().as_millis());
    }
}

fn cooling_exit(ctx: &mut FsmContext) {
    if ctx.actuators.cooling {
        ctx.actuators.cooling = false;
        ctx.mark_off();
    }
}

fn cooling_update(ctx: &mut FsmContext) -> Option<OperatingMode> {
    match ctx.selected {
        SelectedMode::Auto if reference(ctx) < ctx.thresholds.outer_low => {
            Some(OperatingMode::Heating)
        }
        SelectedMode::HeatOnly => Some(OperatingMode::Heating),
        _ => None,
    }
}

fn cooling_regulate(ctx: &mut FsmContext) {
    let t = reference(ctx);
    if ctx.actuators.cooling {
        if t < ctx.thresholds.inner_low {
            info!("Compressor off at {t:.2} C");
            ctx.actuators.cooling = false;
            ctx.mark_off();
        }
    } else if ctx.gates.can_restart && t > ctx.thresholds.inner_high {
        info!("Compressor on at {t:.2} C");
        ctx.actuators.cooling = true;
        ctx.actuators.blowing = true;
    } else {
        ctx.release_fan_if_lingered();
    }
}
