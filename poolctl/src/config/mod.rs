/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Controller configuration loading and management.
//!
//! The expected YAML structure (every key optional):
//! ```yaml
//! pool_mode: true
//! pins:
//!   pool:    { filter: 14, chlorine_pump: 15, heater: 18 }
//!   hot_tub: { filter: 24, chlorine_pump: 25, heater: 23, heater_pump: 8 }
//! sensors:
//!   poll_secs: 5
//!   water: "28-0316a2794aff"
//!   cabin: ""
//!   barrel: ""
//! temperature_control: false
//! data_dir: "/var/lib/poolctl"
//! listen: "127.0.0.1:8080"
//! gpio_root: "/sys/class/gpio"
//! w1_root: "/sys/bus/w1/devices"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::controller::ControllerSettings;
use crate::device::sensor::SensorIds;
use crate::device::{DeviceId, DevicePins, Mode};

// ── YAML sections ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolPins {
    pub filter: u32,
    pub chlorine_pump: u32,
    pub heater: u32,
}

impl Default for PoolPins {
    fn default() -> Self {
        Self {
            filter: 14,
            chlorine_pump: 15,
            heater: 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HotTubPins {
    /// Filter and UV lamp share one relay.
    pub filter: u32,
    pub chlorine_pump: u32,
    pub heater: u32,
    pub heater_pump: u32,
}

impl Default for HotTubPins {
    fn default() -> Self {
        Self {
            filter: 24,
            chlorine_pump: 25,
            heater: 23,
            heater_pump: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub pool: PoolPins,
    pub hot_tub: HotTubPins,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub poll_secs: u64,
    /// 1-Wire device ids; empty means "take the next discovered probe".
    pub water: String,
    pub cabin: String,
    pub barrel: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            poll_secs: 5,
            water: String::new(),
            cabin: String::new(),
            barrel: String::new(),
        }
    }
}

// ── ControllerConfig ──────────────────────────────────────────────────────────

/// Everything the daemon reads from its configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub pool_mode: bool,
    pub pins: PinConfig,
    pub sensors: SensorConfig,
    pub temperature_control: bool,
    pub data_dir: PathBuf,
    pub listen: String,
    pub gpio_root: PathBuf,
    pub w1_root: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pool_mode: true,
            pins: PinConfig::default(),
            sensors: SensorConfig::default(),
            temperature_control: false,
            data_dir: PathBuf::from("."),
            listen: String::from("127.0.0.1:8080"),
            gpio_root: PathBuf::from("/sys/class/gpio"),
            w1_root: PathBuf::from("/sys/bus/w1/devices"),
        }
    }
}

impl ControllerConfig {
    pub fn mode(&self) -> Mode {
        Mode::from_pool_flag(self.pool_mode)
    }

    /// GPIO lines for the configured installation.
    pub fn device_pins(&self) -> DevicePins {
        match self.mode() {
            Mode::Pool => {
                let p = &self.pins.pool;
                DevicePins::new()
                    .with(DeviceId::Filter, p.filter)
                    .with(DeviceId::ChlorinePump, p.chlorine_pump)
                    .with(DeviceId::Heater, p.heater)
            }
            Mode::HotTub => {
                let p = &self.pins.hot_tub;
                DevicePins::new()
                    .with(DeviceId::Filter, p.filter)
                    .with(DeviceId::ChlorinePump, p.chlorine_pump)
                    .with(DeviceId::Heater, p.heater)
                    .with(DeviceId::HeaterPump, p.heater_pump)
            }
        }
    }

    pub fn sensor_ids(&self) -> SensorIds {
        SensorIds {
            water: self.sensors.water.clone(),
            cabin: self.sensors.cabin.clone(),
            barrel: self.sensors.barrel.clone(),
        }
    }

    /// Sensor poll period; zero is bumped to one second.
    pub fn sensor_poll(&self) -> Duration {
        Duration::from_secs(self.sensors.poll_secs.max(1))
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            mode: self.mode(),
            temperature_control: self.temperature_control,
            sensor_poll: self.sensor_poll(),
        }
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads and holds the controller configuration.
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: ControllerConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces the current configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.  The previous configuration is reset to defaults
    /// either way.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading controller configuration from: {}", path.display());

        self.config = ControllerConfig::default();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        // An empty document is a valid "all defaults" file
        let config: ControllerConfig = if content.trim().is_empty() {
            ControllerConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        debug!("  Pins: {:?}", config.device_pins());
        info!(
            "Configuration loaded | mode: {:?} | data dir: {} | listen: {} | temperature control: {}",
            config.mode(),
            config.data_dir.display(),
            config.listen,
            config.temperature_control,
        );

        self.config = config;
        self.loaded = true;
        Ok(())
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Mutable access for command-line overrides.
    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
