//! fermctl firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;
pub mod scheduler;

// Hardware-facing modules compile on every target; the ESP-IDF
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
