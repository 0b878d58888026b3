/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Actuator and sensor boundary.
//!
//! The controller core talks to equipment only through the [`Actuator`] and
//! [`SensorSource`] traits.  Two actuator implementations ship here:
//!
//! | Type | Backing |
//! |---|---|
//! | [`SysfsGpio`] | Linux sysfs GPIO (`/sys/class/gpio`) |
//! | [`SimulatedActuator`] | in-memory, used when GPIO is not accessible |
//!
//! [`open_actuator`] tries the real hardware first and degrades to the
//! simulated actuator instead of failing the process.

pub mod sensor;
pub mod simulated;
pub mod sysfs;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use sensor::{NoSensors, OneWireSensors, SensorSource, Temperatures};
pub use simulated::SimulatedActuator;
pub use sysfs::SysfsGpio;

// ── Installation mode ─────────────────────────────────────────────────────────

/// Which installation the controller drives.
///
/// The hot tub has a dedicated heater-circulation pump that must be running
/// before its heater element may stay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Pool,
    HotTub,
}

impl Mode {
    pub fn from_pool_flag(pool_mode: bool) -> Self {
        if pool_mode {
            Mode::Pool
        } else {
            Mode::HotTub
        }
    }
}

// ── Devices ───────────────────────────────────────────────────────────────────

/// A switchable piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceId {
    ChlorinePump,
    Filter,
    Heater,
    /// Hot-tub heater-circulation pump.
    HeaterPump,
}

impl DeviceId {
    pub const ALL: [DeviceId; 4] = [
        DeviceId::ChlorinePump,
        DeviceId::Filter,
        DeviceId::Heater,
        DeviceId::HeaterPump,
    ];
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceId::ChlorinePump => "chlorine_pump",
            DeviceId::Filter => "filter",
            DeviceId::Heater => "heater",
            DeviceId::HeaterPump => "heater_pump",
        };
        f.write_str(name)
    }
}

/// GPIO line number per device for the active installation.
///
/// Devices without a pin (the heater pump in pool mode) are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DevicePins {
    pins: BTreeMap<DeviceId, u32>,
}

impl DevicePins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style pin assignment.
    pub fn with(mut self, device: DeviceId, pin: u32) -> Self {
        self.pins.insert(device, pin);
        self
    }

    pub fn pin(&self, device: DeviceId) -> Option<u32> {
        self.pins.get(&device).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, u32)> + '_ {
        self.pins.iter().map(|(d, p)| (*d, *p))
    }
}

// ── Actuator ──────────────────────────────────────────────────────────────────

/// Errors opening an actuator backend.
///
/// Only construction can fail.  Once open, writes are assumed instantaneous
/// and reliable; an I/O failure on an individual write is logged and the
/// read-back guards in the interlock controller catch the consequence.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("GPIO root {path} is not accessible")]
    Inaccessible { path: String },

    #[error("GPIO {pin} ({device}): {source}")]
    Io {
        device: DeviceId,
        pin: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Write/read access to device outputs.
pub trait Actuator: Send {
    /// Drive `device` on or off.  Devices without an output are ignored.
    fn write(&mut self, device: DeviceId, on: bool);

    /// Current output level.  Unreadable or absent devices read as off.
    fn read(&self, device: DeviceId) -> bool;

    /// Release the output.  Calling it twice is harmless.
    fn release(&mut self, device: DeviceId);

    /// Release every device (shutdown path).
    fn release_all(&mut self) {
        for device in DeviceId::ALL {
            self.release(device);
        }
    }
}

/// Open the sysfs GPIO actuator, falling back to [`SimulatedActuator`] when
/// the GPIO root cannot be used or `simulate` is set.
pub fn open_actuator(gpio_root: &Path, pins: &DevicePins, simulate: bool) -> Box<dyn Actuator> {
    if simulate {
        info!("Simulated actuator requested");
        return Box::new(SimulatedActuator::new());
    }

    match SysfsGpio::open(gpio_root, pins) {
        Ok(gpio) => {
            info!(root = %gpio_root.display(), "Using sysfs GPIO actuator");
            Box::new(gpio)
        }
        Err(e) => {
            warn!("Could not access GPIO ({e}); setting up simulated actuator");
            Box::new(SimulatedActuator::new())
        }
    }
}
