//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the main loop stalls, so a hung command poll or
//! a wedged 1-Wire bus can never leave the compressor relay latched.
//! The main loop calls [`Watchdog::feed`] once per iteration.

use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

pub struct Watchdog {
    timeout: Duration,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout: Duration) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: timeout.as_millis() as u32,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout)", timeout.as_millis());
                } else {
                    warn!("Watchdog: failed to subscribe ({})", ret);
                }
                Self { timeout, subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms, not enforced", timeout.as_millis());
            if timeout.is_zero() {
                warn!("Watchdog(sim): zero timeout");
            }
            Self { timeout }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feed the watchdog.  Must be called at least once per timeout.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
