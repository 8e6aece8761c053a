//! Output drivers and one-shot peripheral initialisation.

pub mod hw_init;
pub mod relay;
pub mod watchdog;
