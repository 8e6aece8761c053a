//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] and [`SettingsPort`] for the chamber
//! controller.
//!
//! # Layout
//!
//! | Namespace | Key      | Content                                 |
//! |-----------|----------|-----------------------------------------|
//! | `fermctl` | `syscfg` | postcard-encoded [`SystemConfig`]       |
//! | `fermctl` | `mode`   | selected mode, one byte                 |
//! | `fermctl` | `tempH`  | threshold, `f32` little-endian          |
//! | `fermctl` | `tempHH` | threshold, `f32` little-endian          |
//! | `fermctl` | `tempL`  | threshold, `f32` little-endian          |
//! | `fermctl` | `tempLL` | threshold, `f32` little-endian          |
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Settings are stored key by key; each key falls back to its default
//!   independently when missing or unreadable.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().

use crate::app::ports::{ConfigError, ConfigPort, SettingsPort, StorageError};
use crate::config::{SelectedMode, Settings, SystemConfig, Threshold};
use crate::sensors::ds18b20;
use log::{debug, info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const NAMESPACE: &str = "fermctl";
const CONFIG_KEY: &str = "syscfg";
const MODE_KEY: &str = "mode";

const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// An adapter that skips flash initialisation.  On the device every
    /// access then fails and callers fall back to defaults.
    pub fn detached() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NUL-terminated copy of an NVS name (15 chars max).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    // ── Raw blob access ───────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn get(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let composite = Self::composite_key(namespace, key);
        match self.store.borrow().get(&composite) {
            Some(data) if data.len() > buf.len() => Err(StorageError::Corrupted),
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    #[cfg(target_os = "espidf")]
    fn get(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let key_buf = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match result {
            Ok(size) => Ok(size),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(StorageError::Corrupted),
            Err(_) => Err(StorageError::IoError),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn put(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn put(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let key_buf = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => Ok(()),
            Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(StorageError::Full),
            Err(e) => {
                warn!("NvsAdapter: write {}::{} failed ({})", namespace, key, e);
                Err(StorageError::IoError)
            }
        }
    }

    // ── Settings keys ─────────────────────────────────────────

    /// Read a fixed-size value, logging anything but a clean hit.
    fn read_key<const N: usize>(&self, key: &str) -> Option<[u8; N]> {
        let mut buf = [0u8; N];
        match self.get(NAMESPACE, key, &mut buf) {
            Ok(len) if len == N => Some(buf),
            Ok(len) => {
                warn!("NvsAdapter: '{}' has {} bytes, expected {}", key, len, N);
                None
            }
            Err(StorageError::NotFound) => {
                debug!("NvsAdapter: '{}' not stored", key);
                None
            }
            Err(e) => {
                warn!("NvsAdapter: '{}' unreadable: {}", key, e);
                None
            }
        }
    }
}

// ── Config validation ─────────────────────────────────────────

pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(50..=10_000).contains(&cfg.sample_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "sample_period_ms must be 50–10000",
        ));
    }
    if !(100..=10_000).contains(&cfg.control_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_period_ms must be 100–10000",
        ));
    }
    if cfg.control_period_ms < cfg.sample_period_ms {
        return Err(ConfigError::ValidationFailed(
            "control_period_ms must be >= sample_period_ms",
        ));
    }
    if !(100..=60_000).contains(&cfg.command_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "command_period_ms must be 100–60000",
        ));
    }
    if cfg.command_poll_timeout_ms >= cfg.command_period_ms {
        return Err(ConfigError::ValidationFailed(
            "command_poll_timeout_ms must be < command_period_ms",
        ));
    }
    if !(1..=32).contains(&cfg.max_commands_per_poll) {
        return Err(ConfigError::ValidationFailed(
            "max_commands_per_poll must be 1–32",
        ));
    }
    if !(5..=3600).contains(&cfg.telemetry_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_secs must be 5–3600",
        ));
    }
    if cfg.compressor_rest_secs > 1800 {
        return Err(ConfigError::ValidationFailed(
            "compressor_rest_secs must be 0–1800",
        ));
    }
    if cfg.fan_linger_secs > 3600 {
        return Err(ConfigError::ValidationFailed(
            "fan_linger_secs must be 0–3600",
        ));
    }
    if cfg.fan_linger_secs <= cfg.compressor_rest_secs {
        return Err(ConfigError::ValidationFailed(
            "fan_linger_secs must be > compressor_rest_secs",
        ));
    }
    if !(100..=1000).contains(&cfg.conversion_time_ms) {
        return Err(ConfigError::ValidationFailed(
            "conversion_time_ms must be 100–1000",
        ));
    }
    if cfg.sample_stale_after_ms <= cfg.control_period_ms
        || cfg.sample_stale_after_ms <= cfg.conversion_time_ms
        || cfg.sample_stale_after_ms > 600_000
    {
        return Err(ConfigError::ValidationFailed(
            "sample_stale_after_ms must exceed the control period and conversion time, max 600000",
        ));
    }
    for rom in [cfg.chamber_probe_rom, cfg.liquid_probe_rom].iter().flatten() {
        if !ds18b20::rom_is_valid(rom) {
            return Err(ConfigError::ValidationFailed(
                "probe ROM code has a bad family code or CRC",
            ));
        }
    }
    if cfg.chamber_probe_rom.is_none() && cfg.liquid_probe_rom.is_some() {
        return Err(ConfigError::ValidationFailed(
            "liquid_probe_rom requires chamber_probe_rom",
        ));
    }
    Ok(())
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        match self.get(NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
            Err(StorageError::Corrupted) => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: config read error {}, using defaults", e);
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::IoError);
        }
        self.put(NAMESPACE, CONFIG_KEY, &bytes).map_err(|e| match e {
            StorageError::Full => ConfigError::StorageFull,
            _ => ConfigError::IoError,
        })?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

// ── SettingsPort ──────────────────────────────────────────────

impl SettingsPort for NvsAdapter {
    fn load_settings(&self, defaults: Settings) -> Settings {
        let mut settings = defaults;

        if let Some([raw]) = self.read_key::<1>(MODE_KEY) {
            match SelectedMode::from_u8(raw) {
                Some(mode) => settings.selected = mode,
                None => warn!("NvsAdapter: unknown mode {}, keeping {}", raw, defaults.selected),
            }
        }

        for which in Threshold::ALL {
            if let Some(bytes) = self.read_key::<4>(which.key()) {
                let value = f32::from_le_bytes(bytes);
                if value.is_finite() {
                    settings.thresholds.set(which, value);
                } else {
                    warn!("NvsAdapter: '{}' is not finite, keeping default", which.key());
                }
            }
        }

        info!(
            "NvsAdapter: settings loaded, mode {}, {:?}",
            settings.selected, settings.thresholds
        );
        settings
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.put(NAMESPACE, MODE_KEY, &[settings.selected.as_u8()])?;
        for which in Threshold::ALL {
            let bytes = settings.thresholds.get(which).to_le_bytes();
            self.put(NAMESPACE, which.key(), &bytes)?;
        }
        debug!("NvsAdapter: settings saved");
        Ok(())
    }
}
