/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Linux sysfs GPIO actuator.
//!
//! Each configured pin is exported through `<root>/export`, set to output via
//! `<root>/gpioN/direction`, and driven through `<root>/gpioN/value`.
//! Release writes the pin number to `<root>/unexport`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::{Actuator, ActuatorError, DeviceId, DevicePins};

pub struct SysfsGpio {
    root: PathBuf,
    pins: BTreeMap<DeviceId, u32>,
    exported: BTreeSet<DeviceId>,
}

impl SysfsGpio {
    /// Export every pin in `pins` as an output.
    ///
    /// Fails when `root` has no `export` control file (GPIO not present or
    /// not permitted) or when a pin cannot be configured.
    pub fn open(root: &Path, pins: &DevicePins) -> Result<Self, ActuatorError> {
        let export = root.join("export");
        if !export.is_file() {
            return Err(ActuatorError::Inaccessible {
                path: root.display().to_string(),
            });
        }

        let mut gpio = Self {
            root: root.to_path_buf(),
            pins: pins.iter().collect(),
            exported: BTreeSet::new(),
        };

        for (device, pin) in pins.iter() {
            let io = |source| ActuatorError::Io { device, pin, source };
            let line = gpio.line_dir(pin);
            if !line.is_dir() {
                fs::write(&export, pin.to_string()).map_err(io)?;
            }
            fs::write(line.join("direction"), "out").map_err(io)?;
            gpio.exported.insert(device);
            debug!(device = %device, pin, "GPIO exported as output");
        }

        info!(pins = gpio.pins.len(), "sysfs GPIO ready");
        Ok(gpio)
    }

    fn line_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }
}

impl Actuator for SysfsGpio {
    fn write(&mut self, device: DeviceId, on: bool) {
        let Some(&pin) = self.pins.get(&device) else {
            return;
        };
        let value = if on { "1" } else { "0" };
        if let Err(e) = fs::write(self.line_dir(pin).join("value"), value) {
            error!(device = %device, pin, "GPIO write failed: {e}");
        }
    }

    fn read(&self, device: DeviceId) -> bool {
        let Some(&pin) = self.pins.get(&device) else {
            return false;
        };
        match fs::read_to_string(self.line_dir(pin).join("value")) {
            Ok(v) => v.trim() == "1",
            Err(e) => {
                error!(device = %device, pin, "GPIO read failed: {e}");
                false
            }
        }
    }

    fn release(&mut self, device: DeviceId) {
        if !self.exported.remove(&device) {
            return;
        }
        let Some(&pin) = self.pins.get(&device) else {
            return;
        };
        if let Err(e) = fs::write(self.root.join("unexport"), pin.to_string()) {
            error!(device = %device, pin, "GPIO unexport failed: {e}");
        } else {
            debug!(device = %device, pin, "GPIO released");
        }
    }
}
