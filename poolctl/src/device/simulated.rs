/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory actuator used when GPIO is unavailable and in tests.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use super::{Actuator, DeviceId};

/// Keeps device levels in memory and logs every write.
///
/// Devices marked with [`with_failed`](Self::with_failed) ignore writes and
/// always read as off, modelling an output that never energises.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    levels: BTreeMap<DeviceId, bool>,
    failed: BTreeSet<DeviceId>,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `device` as broken: writes are dropped.
    pub fn with_failed(mut self, device: DeviceId) -> Self {
        self.failed.insert(device);
        self
    }
}

impl Actuator for SimulatedActuator {
    fn write(&mut self, device: DeviceId, on: bool) {
        if self.failed.contains(&device) {
            info!(device = %device, on, "simulated write dropped (failed output)");
            return;
        }
        if self.levels.insert(device, on) != Some(on) {
            info!(device = %device, "simulated output now {}", if on { "on" } else { "off" });
        }
    }

    fn read(&self, device: DeviceId) -> bool {
        self.levels.get(&device).copied().unwrap_or(false)
    }

    fn release(&mut self, device: DeviceId) {
        if self.levels.remove(&device).is_some() {
            info!(device = %device, "released simulated output");
        }
    }
}
