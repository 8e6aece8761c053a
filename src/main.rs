//! fermctl firmware — main entry point.
//!
//! Hexagonal architecture with a scheduler-driven event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter      Esp32Time    │
//! │  (Sensor+Actuator) (EventSink)    (Config+Settings)(TimePort)  │
//! │  ConsoleChannel                                                │
//! │  (CommandChannel)                                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ControlService         CommandInterpreter             │    │
//! │  │  FSM · hysteresis ·     parse · mutate · persist ·     │    │
//! │  │  compressor timer       status replies                 │    │
//! │  └──────────── SampleStore · SharedState ─────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) ──▶ Event queue ──▶ dispatch      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use core::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use fermctl::adapters::console::ConsoleChannel;
use fermctl::adapters::hardware::HardwareAdapter;
use fermctl::adapters::log_sink::LogEventSink;
use fermctl::adapters::nvs::NvsAdapter;
use fermctl::adapters::time::Esp32TimeAdapter;
use fermctl::app::events::AppEvent;
use fermctl::app::interpreter::{CommandInterpreter, StatusSources};
use fermctl::app::ports::{ConfigPort, EventSink, SchedulerDelegate, SettingsPort, TimePort};
use fermctl::app::service::{self, ControlService};
use fermctl::app::shared::SharedState;
use fermctl::config::{Settings, SystemConfig};
use fermctl::drivers::hw_init;
use fermctl::drivers::relay::RelayBank;
use fermctl::drivers::watchdog::Watchdog;
use fermctl::events::{self, Event, push_event};
use fermctl::scheduler::{Activity, Scheduler};
use fermctl::sensors::onewire::OneWireBus;
use fermctl::sensors::{ProbeHub, SampleStore};

/// Latest probe readings, written by the sampling activity.
static SAMPLES: SampleStore = SampleStore::new();
/// Settings (command activity → control) and control status (control → replies).
static SHARED: SharedState = SharedState::new(Settings::FACTORY);

const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for one idle sleep of the main loop.
const MAX_IDLE: Duration = Duration::from_millis(100);

#[cfg(not(target_os = "espidf"))]
const SIM_AMBIENT_C: f32 = 24.0;
#[cfg(not(target_os = "espidf"))]
const SIM_SPEEDUP: f32 = 20.0;

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the event system)
// to the event queue.

struct EventQueueDelegate;

impl SchedulerDelegate for EventQueueDelegate {
    fn on_schedule_fired(&mut self, label: &str) {
        match Event::from_label(label) {
            Some(event) => {
                if !push_event(event) {
                    warn!("Event queue full, dropped {:?}", event);
                }
            }
            None => warn!("Schedule fired for unknown activity '{}'", label),
        }
    }
}

fn millis(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

// ── Platform bootstrap ────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_runtime() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_runtime() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

/// Open the 1-Wire bus on [`fermctl::pins::ONEWIRE_GPIO`].
#[cfg(target_os = "espidf")]
fn open_probe_bus(_config: &mut SystemConfig) -> Result<impl OneWireBus + use<>> {
    use esp_idf_hal::delay::Ets;
    use esp_idf_hal::gpio::{PinDriver, Pull};
    use esp_idf_hal::peripherals::Peripherals;
    use fermctl::error::Error;
    use fermctl::sensors::onewire::OneWire;

    let peripherals = Peripherals::take()?;
    let mut pin = PinDriver::input_output_od(peripherals.pins.gpio4)?;
    pin.set_pull(Pull::Up)?;
    let bus = OneWire::new(pin, Ets).map_err(Error::from)?;
    Ok(bus)
}

/// Simulated probes backed by a thermal model of the chamber.
#[cfg(not(target_os = "espidf"))]
fn open_probe_bus(config: &mut SystemConfig) -> Result<impl OneWireBus + use<>> {
    use fermctl::adapters::sim::{SimBus, ThermalModel};

    let bus = SimBus::new(
        ThermalModel::new(SIM_AMBIENT_C),
        config.relays_active_high,
        SIM_SPEEDUP,
    );
    bus.install_roms(config);
    info!("Simulation: ambient {:.1}\u{00b0}C, {}x speed", SIM_AMBIENT_C, SIM_SPEEDUP);
    Ok(bus)
}

/// Name shown in the `/start` greeting for the console user.
fn console_sender() -> Option<String> {
    #[cfg(not(target_os = "espidf"))]
    {
        std::env::var("USER").ok()
    }
    #[cfg(target_os = "espidf")]
    {
        None
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Runtime bootstrap ──────────────────────────────────
    init_runtime()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  fermctl v{:<27}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            // Continue without NVS; nothing is persisted this session.
            warn!("NVS init failed ({}), running with defaults", e);
            NvsAdapter::detached()
        }
    };
    let mut config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(config.relays_active_high)
        .map_err(|e| anyhow!("HAL init failed: {e}"))?;
    let bus = open_probe_bus(&mut config)?;
    let probes = ProbeHub::new(bus, &config)?;
    let mut hw = HardwareAdapter::new(probes, RelayBank::new(config.relays_active_high));

    // ── 4. Settings + services ────────────────────────────────
    let settings = nvs.load_settings(Settings::with_mode(config.default_mode));
    SHARED.set_settings(settings);

    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut control = ControlService::new(&config, settings, clock.now());
    control.start(&mut hw, &mut sink);
    SHARED.publish_status(control.status());

    let mut interpreter = CommandInterpreter::new(nvs);
    let mut channel = ConsoleChannel::spawn(console_sender());
    let sources = StatusSources {
        shared: &SHARED,
        samples: &SAMPLES,
    };

    // ── 5. Scheduler ──────────────────────────────────────────
    let mut sched = Scheduler::new();
    let mut sched_delegate = EventQueueDelegate;
    let now = clock.now();
    let command_period = millis(config.command_period_ms);
    let telemetry_period = Duration::from_secs(u64::from(config.telemetry_interval_secs));
    for activity in [
        Activity::every(Event::SampleTick.label(), millis(config.sample_period_ms)),
        Activity::every(Event::ControlTick.label(), millis(config.control_period_ms)),
        Activity::every(Event::CommandTick.label(), command_period).with_phase(command_period),
        Activity::every(Event::TelemetryTick.label(), telemetry_period)
            .with_phase(telemetry_period),
    ] {
        if sched.add(activity, now).is_none() {
            return Err(anyhow!("scheduler rejected '{}'", activity.label));
        }
    }

    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT);
    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        sched.tick(clock.now(), &mut sched_delegate);

        events::drain_events(|event| match event {
            Event::SampleTick => {
                service::sample_tick(&mut hw, &SAMPLES, clock.now());
            }

            Event::ControlTick => {
                let status = control.tick(
                    SHARED.settings(),
                    &SAMPLES.snapshot(),
                    clock.now(),
                    &mut hw,
                    &mut sink,
                );
                SHARED.publish_status(status);
            }

            Event::CommandTick => {
                interpreter.process_inbound(
                    &mut channel,
                    config.max_commands_per_poll,
                    config.command_poll_timeout(),
                    &sources,
                    &mut sink,
                );
            }

            Event::TelemetryTick => {
                let t = control.build_telemetry(
                    &SHARED.settings(),
                    &SAMPLES.snapshot(),
                    clock.uptime_secs() as u32,
                );
                sink.emit(&AppEvent::Telemetry(t));
            }
        });

        // Feed watchdog on every iteration.
        watchdog.feed();

        let idle = sched.until_next(clock.now()).unwrap_or(MAX_IDLE);
        if !idle.is_zero() {
            std::thread::sleep(idle.min(MAX_IDLE));
        }
    }
}
