//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | DS18B20 probes on 1-Wire    |
//! |                | ActuatorPort       | Relay GPIOs                 |
//! | `console`      | CommandChannel     | UART console / stdin        |
//! | `log_sink`     | EventSink          | Serial log output           |
//! | `nvs`          | ConfigPort         | NVS / in-memory store       |
//! |                | SettingsPort       |                             |
//! | `time`         | TimePort           | ESP32 system timer          |
//! | `sim`          | OneWireBus         | Thermal model (host only)   |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
pub mod time;
