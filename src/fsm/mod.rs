//! Function-pointer finite state machine over the operating mode.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌───────────┬──────────┬─────────┬───────────────────┬─────────┐ │
//! │  │ Mode      │ on_enter │ on_exit │ on_update         │regulate │ │
//! │  ├───────────┼──────────┼─────────┼───────────────────┼─────────┤ │
//! │  │ Undefined │ fn(ctx)  │   —     │ fn(ctx)->Option<> │ fn(ctx) │ │
//! │  │ Heating   │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ fn(ctx) │ │
//! │  │ Cooling   │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ fn(ctx) │ │
//! │  └───────────┴──────────┴─────────┴───────────────────┴─────────┘ │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine:
//!
//! 1. handles the two overrides — selected mode `Off` (everything off,
//!    mode forced to `Undefined`) and "no usable sample" (mode forced to
//!    `Undefined`, no activation);
//! 2. otherwise calls `on_update` for the **current** mode; if it
//!    returns `Some(next)` the engine runs `on_exit(current)`, moves the
//!    pointer, and runs `on_enter(next)`;
//! 3. calls `regulate` for the (possibly new) mode, which applies the
//!    inner-threshold hysteresis to the actuator states.
//!
//! So the mode changes at most once per tick.

pub mod context;
pub mod states;

use core::fmt;

use context::{ActuatorState, FsmContext};
use log::info;
use serde::Serialize;

use crate::config::SelectedMode;

// ---------------------------------------------------------------------------
// Operating mode (state identity)
// ---------------------------------------------------------------------------

/// Operating mode derived every control tick.  Never persisted.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OperatingMode {
    Undefined = 0,
    Heating = 1,
    Cooling = 2,
}

impl OperatingMode {
    /// Total number of modes — used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `OperatingMode`.  Panics on out-of-range
    /// in debug builds; returns `Undefined` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Undefined,
            1 => Self::Heating,
            2 => Self::Cooling,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Undefined
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Heating => "Heating",
            Self::Cooling => "Cooling",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter`, `on_exit` and `regulate`.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick mode decision.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<OperatingMode>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single operating mode.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: OperatingMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
    pub regulate: StateActionFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The mode state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `OperatingMode as usize`.
    table: [StateDescriptor; OperatingMode::COUNT],
    /// Index of the currently active mode.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given table, starting in `initial`.
    pub fn new(table: [StateDescriptor; OperatingMode::COUNT], initial: OperatingMode) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting mode.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in mode: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one control tick.
    ///
    /// `ctx` must already hold this tick's inputs
    /// (see [`FsmContext::begin_tick`]).
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        if ctx.selected == SelectedMode::Off {
            self.shut_down(ctx);
            return;
        }

        if ctx.reference_c.is_some() {
            if let Some(next) = (self.table[self.current].on_update)(ctx) {
                self.transition(next, ctx);
            }
        } else {
            // No usable sample: no decision can be made.
            self.force_transition(OperatingMode::Undefined, ctx);
        }

        (self.table[self.current].regulate)(ctx);
    }

    /// Force an immediate transition, skipping `on_update`.
    pub fn force_transition(&mut self, next: OperatingMode, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current mode's identity.
    pub fn current_mode(&self) -> OperatingMode {
        OperatingMode::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Selected mode `Off`: every output off at once, mode `Undefined`.
    /// Stopping a running compressor counts as an off event so the rest
    /// interval still applies if cooling is re-enabled soon after.
    fn shut_down(&mut self, ctx: &mut FsmContext) {
        let compressor_was_on = ctx.actuators.cooling;
        ctx.actuators = ActuatorState::all_off();
        self.force_transition(OperatingMode::Undefined, ctx);
        if compressor_was_on {
            ctx.mark_off();
        }
    }

    fn transition(&mut self, next: OperatingMode, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
