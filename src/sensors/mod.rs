//! Probe subsystem: the DS18B20 driver stack, the [`ProbeHub`] that polls
//! both probes, and the [`SampleStore`] shared with the control activity.
//!
//! ## Last-known-good policy
//!
//! A failed read (sentinel −127 °C) marks the probe invalid but keeps the
//! previous numeric value.  The chamber value may stand in as the control
//! reference for at most `sample_stale_after` after the last good read;
//! after that, or if no good read was ever taken, there is no reference
//! and the controller makes no decision.

pub mod ds18b20;
pub mod onewire;

use core::cell::Cell;
use core::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};
use serde::Serialize;

use crate::config::SystemConfig;
use crate::control::clock::Instant;
use crate::error::{Error, SensorError};
use ds18b20::{DISCONNECTED_C, RomCode};
use onewire::OneWireBus;

// ---------------------------------------------------------------------------
// Readings and samples
// ---------------------------------------------------------------------------

/// One completed pair of probe readings, sentinel included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReadings {
    pub chamber_c: f32,
    pub liquid_c: f32,
}

impl ProbeReadings {
    /// Both probes failed.
    pub const DISCONNECTED: Self = Self {
        chamber_c: DISCONNECTED_C,
        liquid_c: DISCONNECTED_C,
    };
}

/// `true` unless the reading is the failure sentinel or not a number.
pub fn is_valid_reading(celsius: f32) -> bool {
    celsius.is_finite() && celsius != DISCONNECTED_C
}

/// Latest state of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeSample {
    /// Most recent good value (°C); meaningless until the first good read.
    pub celsius: f32,
    /// The most recent read succeeded.
    pub valid: bool,
    /// When the most recent good read was taken.
    #[serde(skip)]
    pub last_good_at: Option<Instant>,
}

impl ProbeSample {
    pub const EMPTY: Self = Self {
        celsius: DISCONNECTED_C,
        valid: false,
        last_good_at: None,
    };

    fn accept(&mut self, reading: f32, now: Instant) {
        if is_valid_reading(reading) {
            self.celsius = reading;
            self.valid = true;
            self.last_good_at = Some(now);
        } else {
            self.valid = false;
            // Forget an anchor too old for the wrapping clock to measure.
            if let Some(at) = self.last_good_at {
                if now.checked_duration_since(at).is_none() {
                    self.last_good_at = None;
                }
            }
        }
    }

    /// The value, if a good read was ever taken.
    pub fn last_known(&self) -> Option<f32> {
        self.last_good_at.map(|_| self.celsius)
    }

    /// The value, if it was read within `max_age` of `now`.
    pub fn fresh(&self, now: Instant, max_age: Duration) -> Option<f32> {
        let at = self.last_good_at?;
        let age = now.checked_duration_since(at)?;
        (age <= max_age).then_some(self.celsius)
    }
}

/// Snapshot of both probes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub chamber: ProbeSample,
    pub liquid: ProbeSample,
    /// When the store was last written.
    #[serde(skip)]
    pub updated_at: Option<Instant>,
}

impl Sample {
    pub const EMPTY: Self = Self {
        chamber: ProbeSample::EMPTY,
        liquid: ProbeSample::EMPTY,
        updated_at: None,
    };

    /// The control reference temperature under the last-known-good policy.
    pub fn reference(&self, now: Instant, stale_after: Duration) -> Option<f32> {
        self.chamber.fresh(now, stale_after)
    }

    fn accept(&mut self, readings: ProbeReadings, now: Instant) {
        self.chamber.accept(readings.chamber_c, now);
        self.liquid.accept(readings.liquid_c, now);
        self.updated_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Sample store (shared between sampling and control activities)
// ---------------------------------------------------------------------------

/// Single-slot store for the latest [`Sample`].
///
/// Writers and readers exchange whole copies under a critical-section
/// mutex, so a reader never sees one probe updated and the other not.
pub struct SampleStore {
    inner: Mutex<CriticalSectionRawMutex, Cell<Sample>>,
}

impl SampleStore {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Sample::EMPTY)),
        }
    }

    /// Merge a completed pair of readings and return the new snapshot.
    pub fn publish(&self, readings: ProbeReadings, now: Instant) -> Sample {
        self.inner.lock(|cell| {
            let mut sample = cell.get();
            sample.accept(readings, now);
            cell.set(sample);
            sample
        })
    }

    pub fn snapshot(&self) -> Sample {
        self.inner.lock(|cell| cell.get())
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Probe hub
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    Converting { since: Instant },
}

/// Polls the chamber and liquid probes without ever blocking for a full
/// conversion: one call starts CONVERT T, a later call (once the
/// conversion time has passed) reads both scratchpads and immediately
/// starts the next conversion, so a fresh pair lands every conversion
/// time.
pub struct ProbeHub<B> {
    bus: B,
    chamber_rom: Option<RomCode>,
    liquid_rom: Option<RomCode>,
    conversion_time: Duration,
    phase: Phase,
    chamber_fault: Option<SensorError>,
    liquid_fault: Option<SensorError>,
}

impl<B: OneWireBus> ProbeHub<B> {
    /// Construct a hub over `bus`.  Configured ROM codes are checked here.
    pub fn new(bus: B, config: &SystemConfig) -> Result<Self, Error> {
        for rom in [config.chamber_probe_rom, config.liquid_probe_rom]
            .iter()
            .flatten()
        {
            if !ds18b20::rom_is_valid(rom) {
                return Err(Error::Init("probe ROM code invalid"));
            }
        }
        if config.chamber_probe_rom.is_none() && config.liquid_probe_rom.is_some() {
            return Err(Error::Init("liquid probe needs a chamber probe ROM code"));
        }
        match (config.chamber_probe_rom, config.liquid_probe_rom) {
            (None, _) => info!("Probes: chamber only, SKIP ROM addressing"),
            (Some(c), None) => info!("Probes: chamber {}, no liquid probe", ds18b20::rom_hex(&c)),
            (Some(c), Some(l)) => info!(
                "Probes: chamber {}, liquid {}",
                ds18b20::rom_hex(&c),
                ds18b20::rom_hex(&l)
            ),
        }
        Ok(Self {
            bus,
            chamber_rom: config.chamber_probe_rom,
            liquid_rom: config.liquid_probe_rom,
            conversion_time: config.conversion_time(),
            phase: Phase::Idle,
            chamber_fault: None,
            liquid_fault: None,
        })
    }

    /// Advance the conversion cycle.  Returns `Some` when a pair of
    /// readings completed (possibly as sentinels).
    pub fn poll(&mut self, now: Instant) -> Option<ProbeReadings> {
        match self.phase {
            Phase::Idle => match self.begin_conversion(now) {
                Ok(()) => None,
                Err(e) => {
                    Self::note_fault(&mut self.chamber_fault, "chamber", Some(e));
                    Self::note_fault(&mut self.liquid_fault, "liquid", Some(e));
                    Some(ProbeReadings::DISCONNECTED)
                }
            },
            Phase::Converting { since } => {
                let done = now
                    .checked_duration_since(since)
                    .is_none_or(|d| d >= self.conversion_time);
                if !done {
                    return None;
                }
                let readings = self.read_both();
                // A failed restart leaves the hub idle; the next poll
                // retries and reports it.
                let _ = self.begin_conversion(now);
                Some(readings)
            }
        }
    }

    fn begin_conversion(&mut self, now: Instant) -> Result<(), SensorError> {
        self.phase = Phase::Idle;
        ds18b20::start_conversion(&mut self.bus)?;
        self.phase = Phase::Converting { since: now };
        Ok(())
    }

    fn read_both(&mut self) -> ProbeReadings {
        let chamber = ds18b20::read_temperature(&mut self.bus, self.chamber_rom.as_ref());
        Self::note_fault(&mut self.chamber_fault, "chamber", chamber.err());

        let liquid = match self.liquid_rom.as_ref() {
            Some(rom) => {
                let r = ds18b20::read_temperature(&mut self.bus, Some(rom));
                Self::note_fault(&mut self.liquid_fault, "liquid", r.err());
                r
            }
            None => Err(SensorError::NoPresence),
        };

        ProbeReadings {
            chamber_c: ds18b20::celsius_or_sentinel(chamber),
            liquid_c: ds18b20::celsius_or_sentinel(liquid),
        }
    }

    /// Log fault edges only; a dead probe would otherwise log four times
    /// a second.
    fn note_fault(slot: &mut Option<SensorError>, probe: &str, fault: Option<SensorError>) {
        match (*slot, fault) {
            (None, Some(e)) => warn!("Probe {probe}: {e}"),
            (Some(_), None) => info!("Probe {probe}: recovered"),
            (Some(old), Some(new)) if old != new => warn!("Probe {probe}: {new}"),
            _ => {}
        }
        *slot = fault;
    }
}
