//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules of the chamber controller:
//! control-tick orchestration, the command interpreter, and the reply
//! texts.  All interaction with hardware and the network happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod interpreter;
pub mod ports;
pub mod service;
pub mod shared;
pub mod status;
