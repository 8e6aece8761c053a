//! Settings and config persistence through the NVS adapter (host store).

use std::time::Duration;

use fermctl::adapters::nvs::{NvsAdapter, validate_config};
use fermctl::adapters::sim::probe_rom;
use fermctl::app::interpreter::{CommandInterpreter, StatusSources};
use fermctl::app::ports::{ConfigError, ConfigPort, SettingsPort};
use fermctl::app::shared::SharedState;
use fermctl::config::{SelectedMode, Settings, SystemConfig, Threshold};
use fermctl::sensors::SampleStore;

use crate::mock_hw::{MockChannel, RecordingSink};

/// Run `texts` through an interpreter backed by `nvs`.
fn converse(nvs: NvsAdapter, texts: &[&str]) -> NvsAdapter {
    let shared = SharedState::new(nvs.load_settings(Settings::FACTORY));
    let samples = SampleStore::new();
    let sources = StatusSources {
        shared: &shared,
        samples: &samples,
    };
    let mut interp = CommandInterpreter::new(nvs);
    let mut channel = MockChannel::new();
    let mut sink = RecordingSink::new();
    for text in texts {
        channel.send(1, text);
    }
    interp.process_inbound(&mut channel, 16, Duration::ZERO, &sources, &mut sink);
    interp.into_settings_store()
}

#[test]
fn settings_survive_a_restart() {
    let nvs = converse(
        NvsAdapter::new().unwrap(),
        &["/setModeCool", "/setTempH", "20.75", "/setTempLLm"],
    );

    // Same backing store, fresh load as after a reboot.
    let loaded = nvs.load_settings(Settings::FACTORY);
    assert_eq!(loaded.selected, SelectedMode::CoolOnly);
    assert_eq!(loaded.thresholds.get(Threshold::InnerHigh), 20.75);
    assert_eq!(loaded.thresholds.get(Threshold::OuterLow), 16.0);
    assert_eq!(loaded.thresholds.get(Threshold::OuterHigh), 23.0);
}

#[test]
fn empty_store_yields_defaults() {
    let nvs = NvsAdapter::new().unwrap();
    let defaults = Settings::with_mode(SelectedMode::Auto);
    assert_eq!(nvs.load_settings(defaults), defaults);
}

#[test]
fn config_with_probe_roms_round_trips() {
    let nvs = NvsAdapter::new().unwrap();
    let cfg = SystemConfig {
        chamber_probe_rom: Some(probe_rom(1)),
        liquid_probe_rom: Some(probe_rom(2)),
        default_mode: SelectedMode::Auto,
        relays_active_high: false,
        ..Default::default()
    };
    nvs.save(&cfg).unwrap();

    let loaded = nvs.load().unwrap();
    assert_eq!(loaded.chamber_probe_rom, Some(probe_rom(1)));
    assert_eq!(loaded.liquid_probe_rom, Some(probe_rom(2)));
    assert_eq!(loaded.default_mode, SelectedMode::Auto);
    assert!(!loaded.relays_active_high);
}

#[test]
fn bad_rom_is_rejected_before_write() {
    let nvs = NvsAdapter::new().unwrap();
    let good = SystemConfig {
        chamber_probe_rom: Some(probe_rom(1)),
        ..Default::default()
    };
    nvs.save(&good).unwrap();

    let mut rom = probe_rom(3);
    rom[7] ^= 0xFF;
    let cfg = SystemConfig {
        chamber_probe_rom: Some(rom),
        ..Default::default()
    };
    assert!(matches!(validate_config(&cfg), Err(ConfigError::ValidationFailed(_))));
    assert!(nvs.save(&cfg).is_err());
    assert_eq!(nvs.load().unwrap().chamber_probe_rom, Some(probe_rom(1)));
}

#[test]
fn settings_and_config_share_the_namespace_without_clashing() {
    let nvs = NvsAdapter::new().unwrap();
    nvs.save(&SystemConfig::default()).unwrap();
    nvs.save_settings(&Settings::with_mode(SelectedMode::HeatOnly))
        .unwrap();

    assert_eq!(nvs.load().unwrap().default_mode, SelectedMode::Off);
    assert_eq!(
        nvs.load_settings(Settings::FACTORY).selected,
        SelectedMode::HeatOnly
    );
}
