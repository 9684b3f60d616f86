//! Persistent orchestrator configuration model and defaults.

use std::path::PathBuf;

use log::{info, warn};

use crate::pool::{MAX_SLOTS, MIN_SLOTS};

/// Root configuration persisted to `shufflegrid.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Pool startup and audio preferences.
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Poll cadence and engine settle delays.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Pool startup and audio preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    /// Slot count created at startup.
    #[serde(default = "default_slot_count")]
    pub initial_slot_count: usize,
    /// Global volume applied to fresh slots, `0..=100`.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
}

/// Poll cadence and engine settle delays.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TimingConfig {
    /// Lifecycle poll interval.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Wait after `stop` before an engine instance may be released.
    #[serde(default = "default_stop_settle_ms")]
    pub stop_settle_ms: u64,
    /// Wait after releasing every instance before process teardown.
    #[serde(default = "default_teardown_settle_ms")]
    pub teardown_settle_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            initial_slot_count: default_slot_count(),
            default_volume: default_volume(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            tick_interval_ms: default_tick_interval_ms(),
            stop_settle_ms: default_stop_settle_ms(),
            teardown_settle_ms: default_teardown_settle_ms(),
        }
    }
}

fn default_slot_count() -> usize {
    1
}

fn default_volume() -> u8 {
    100
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_stop_settle_ms() -> u64 {
    100
}

fn default_teardown_settle_ms() -> u64 {
    500
}

/// Clamps every field into its supported range.
pub fn sanitize_config(config: Config) -> Config {
    let clamped_slot_count = config
        .playback
        .initial_slot_count
        .clamp(MIN_SLOTS, MAX_SLOTS);
    let clamped_volume = config.playback.default_volume.min(100);
    let clamped_tick = config.timing.tick_interval_ms.clamp(50, 5_000);
    let clamped_stop_settle = config.timing.stop_settle_ms.min(2_000);
    let clamped_teardown_settle = config.timing.teardown_settle_ms.min(5_000);

    Config {
        playback: PlaybackConfig {
            initial_slot_count: clamped_slot_count,
            default_volume: clamped_volume,
        },
        timing: TimingConfig {
            tick_interval_ms: clamped_tick,
            stop_settle_ms: clamped_stop_settle,
            teardown_settle_ms: clamped_teardown_settle,
        },
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shufflegrid.toml"))
}

/// Loads the config file, writing defaults first if it does not exist yet.
/// Any read or parse problem falls back to defaults with a warning.
pub fn load_or_create() -> Config {
    let Some(config_file) = config_file_path() else {
        warn!("No config directory available, using default config");
        return Config::default();
    };

    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        match toml::to_string(&default_config) {
            Ok(config_text) => {
                if let Err(err) = std::fs::write(&config_file, config_text) {
                    warn!(
                        "Failed to write default config to {}: {}",
                        config_file.display(),
                        err
                    );
                }
            }
            Err(err) => warn!("Failed to serialize default config: {}", err),
        }
        return default_config;
    }

    let config_content = match std::fs::read_to_string(&config_file) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config from {}: {}",
                config_file.display(),
                err
            );
            return Config::default();
        }
    };
    sanitize_config(toml::from_str::<Config>(&config_content).unwrap_or_default())
}
