/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The schedule model: one [`IntervalStore`] per device kind plus the
//! per-kind "schedule enabled" flags and the heater goal temperature.
//!
//! ```text
//! Schedules
//! ├── chlorine : IntervalStore<DoseMl>     start → dose (stop derived)
//! ├── filter   : IntervalStore<ClockTime>  start → stop
//! ├── heater   : IntervalStore<ClockTime>  start → stop
//! ├── {chlorine,filter,heater}_enabled
//! └── goal_temperature
//! ```
//!
//! `Schedules` is the unit that gets persisted and broadcast; it is owned by
//! the control loop and mutated only through the controller.

pub mod dose;
pub mod interval;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::ClockTime;

pub use dose::{to_duration, DoseMl, MAX_QUICK_DOSE_ML, MAX_SCHEDULED_DOSE_ML, MIN_DOSE_ML};
pub use interval::{in_window, Extent, IntervalStore};

/// Default heater goal temperature in °C.
pub const DEFAULT_GOAL_TEMPERATURE_C: f32 = 28.0;

// ── DeviceKind ────────────────────────────────────────────────────────────────

/// A schedulable device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Chlorine,
    Filter,
    Heater,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Chlorine, DeviceKind::Filter, DeviceKind::Heater];
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Chlorine => "chlorine",
            DeviceKind::Filter => "filter",
            DeviceKind::Heater => "heater",
        };
        f.write_str(name)
    }
}

// ── Schedules ─────────────────────────────────────────────────────────────────

/// Every stored interval, the schedule-enabled flags and the goal temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedules {
    pub chlorine_enabled: bool,
    pub filter_enabled: bool,
    pub heater_enabled: bool,

    /// Heater goal temperature (°C) for temperature control.
    pub goal_temperature: f32,

    pub chlorine: IntervalStore<DoseMl>,
    pub filter: IntervalStore<ClockTime>,
    pub heater: IntervalStore<ClockTime>,
}

impl Default for Schedules {
    fn default() -> Self {
        Self {
            chlorine_enabled: true,
            filter_enabled: true,
            heater_enabled: true,
            goal_temperature: DEFAULT_GOAL_TEMPERATURE_C,
            chlorine: IntervalStore::new(),
            filter: IntervalStore::new(),
            heater: IntervalStore::new(),
        }
    }
}

impl Schedules {
    pub fn is_enabled(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::Chlorine => self.chlorine_enabled,
            DeviceKind::Filter => self.filter_enabled,
            DeviceKind::Heater => self.heater_enabled,
        }
    }

    /// Toggle whether boundaries of `kind` take effect.  Stored intervals are
    /// kept either way.
    pub fn set_enabled(&mut self, kind: DeviceKind, enabled: bool) {
        match kind {
            DeviceKind::Chlorine => self.chlorine_enabled = enabled,
            DeviceKind::Filter => self.filter_enabled = enabled,
            DeviceKind::Heater => self.heater_enabled = enabled,
        }
    }

    /// Whether `time` falls inside any window of `kind`, ignoring the
    /// enabled flag.
    pub fn is_scheduled(&self, kind: DeviceKind, time: ClockTime) -> bool {
        match kind {
            DeviceKind::Chlorine => self.chlorine.contains(time),
            DeviceKind::Filter => self.filter.contains(time),
            DeviceKind::Heater => self.heater.contains(time),
        }
    }

    /// Remove the interval of `kind` starting at `start`.
    pub fn remove(&mut self, kind: DeviceKind, start: ClockTime) -> bool {
        match kind {
            DeviceKind::Chlorine => self.chlorine.remove(start),
            DeviceKind::Filter => self.filter.remove(start),
            DeviceKind::Heater => self.heater.remove(start),
        }
    }

    /// `(start, stop)` windows of `kind`.
    pub fn windows(&self, kind: DeviceKind) -> Vec<(ClockTime, ClockTime)> {
        match kind {
            DeviceKind::Chlorine => self.chlorine.windows().collect(),
            DeviceKind::Filter => self.filter.windows().collect(),
            DeviceKind::Heater => self.heater.windows().collect(),
        }
    }

    /// Total number of stored intervals across all kinds.
    pub fn interval_count(&self) -> usize {
        self.chlorine.len() + self.filter.len() + self.heater.len()
    }
}
