//! One-shot GPIO initialisation and raw level writes for the relay outputs.
//!
//! Uses raw ESP-IDF sys calls.  `init_peripherals` is called once from
//! `main()` before the event loop starts, and leaves every relay
//! de-energised.
//!
//! On the host the output levels are kept in an atomic array so the
//! simulation and the tests can observe what the firmware drove.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral initialisation or output writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    GpioWriteFailed(i32),
    InvalidPin(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::GpioWriteFailed(rc) => write!(f, "GPIO write failed (rc={})", rc),
            Self::InvalidPin(pin) => write!(f, "GPIO {} does not exist", pin),
        }
    }
}

// ── Init ──────────────────────────────────────────────────────

/// Configure the relay outputs and drive them to the inactive level.
#[cfg(target_os = "espidf")]
pub fn init_peripherals(relays_active_high: bool) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe { init_relay_outputs(relays_active_high)? };
    info!("hw_init: relay outputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(relays_active_high: bool) -> Result<(), HwInitError> {
    for &pin in &pins::RELAY_GPIOS {
        gpio_write(pin, !relays_active_high)?;
    }
    log::info!("hw_init(sim): relay outputs parked");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_relay_outputs(active_high: bool) -> Result<(), HwInitError> {
    for &pin in &pins::RELAY_GPIOS {
        // Park the level before switching to output so the relay never
        // clicks during boot.
        unsafe { gpio_set_level(pin, u32::from(!active_high)) };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), HwInitError> {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_relay_outputs(). Main-loop only.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioWriteFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
static SIM_LEVELS: [AtomicBool; (pins::MAX_GPIO + 1) as usize] =
    [const { AtomicBool::new(false) }; (pins::MAX_GPIO + 1) as usize];

#[cfg(not(target_os = "espidf"))]
fn sim_slot(pin: i32) -> Result<&'static AtomicBool, HwInitError> {
    usize::try_from(pin)
        .ok()
        .and_then(|idx| SIM_LEVELS.get(idx))
        .ok_or(HwInitError::InvalidPin(pin))
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), HwInitError> {
    sim_slot(pin)?.store(high, Ordering::Relaxed);
    Ok(())
}

/// Last level written to `pin` (host simulation only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_level(pin: i32) -> Option<bool> {
    sim_slot(pin).ok().map(|slot| slot.load(Ordering::Relaxed))
}
