/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Safety interlocks between the chlorine pump, filter and heater.
//!
//! Every device write goes through [`InterlockController`], which enforces:
//!
//! * chlorine on ⇒ filter on (chlorine is reverted if the filter does not
//!   read back on),
//! * heater on ⇒ filter on (and, for the hot tub, the heater-circulation
//!   pump on),
//! * the filter never turns off while chlorine or the heater is running,
//! * an active quick dose suppresses scheduled chlorine/filter-off changes
//!   until it expires.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ControlError;
use super::timer::{Boundary, Edge, TimerEvent, TimerHandle, Timers};
use crate::device::{Actuator, DeviceId, Mode, Temperatures};
use crate::schedule::{dose, DeviceKind, Schedules};
use crate::time::ClockTime;

/// Heater switches on below `goal - HEATER_HYSTERESIS_C`.
pub const HEATER_HYSTERESIS_C: f32 = 2.0;

/// Read-back levels of every output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStates {
    pub chlorine_on: bool,
    pub filter_on: bool,
    pub heater_on: bool,
    /// `None` in pool mode, which has no circulation pump.
    pub heater_pump_on: Option<bool>,
}

struct QuickDose {
    id: u64,
    stop_time: ClockTime,
    timer: TimerHandle,
}

pub struct InterlockController {
    actuator: Box<dyn Actuator>,
    mode: Mode,
    timers: Timers,
    quick_dose: Option<QuickDose>,
    next_dose_id: u64,
    temperature_control: bool,
}

impl InterlockController {
    pub fn new(
        actuator: Box<dyn Actuator>,
        mode: Mode,
        timers: Timers,
        temperature_control: bool,
    ) -> Self {
        Self {
            actuator,
            mode,
            timers,
            quick_dose: None,
            next_dose_id: 0,
            temperature_control,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn device_states(&self) -> DeviceStates {
        DeviceStates {
            chlorine_on: self.actuator.read(DeviceId::ChlorinePump),
            filter_on: self.actuator.read(DeviceId::Filter),
            heater_on: self.actuator.read(DeviceId::Heater),
            heater_pump_on: match self.mode {
                Mode::Pool => None,
                Mode::HotTub => Some(self.actuator.read(DeviceId::HeaterPump)),
            },
        }
    }

    fn is_on(&self, device: DeviceId) -> bool {
        self.actuator.read(device)
    }

    // ── Device intents ────────────────────────────────────────────────────────

    /// Switch the chlorine pump.  Turning it off ends any quick dose.
    pub fn set_chlorine_on(&mut self, on: bool) {
        if on {
            if !self.is_on(DeviceId::Filter) {
                self.set_filter_on(true);
            }
            self.actuator.write(DeviceId::ChlorinePump, true);
            if !self.is_on(DeviceId::Filter) {
                warn!("filter did not come on, chlorine pump reverted");
                self.actuator.write(DeviceId::ChlorinePump, false);
            }
        } else {
            self.actuator.write(DeviceId::ChlorinePump, false);
            self.cancel_quick_dose();
        }
    }

    /// Switch the filter.  Returns `false` when an off request is refused
    /// because chlorine or the heater is still running.
    pub fn set_filter_on(&mut self, on: bool) -> bool {
        if !on && (self.is_on(DeviceId::ChlorinePump) || self.is_on(DeviceId::Heater)) {
            debug!("filter off refused: chlorine or heater running");
            return false;
        }
        self.actuator.write(DeviceId::Filter, on);
        true
    }

    /// Switch the heater together with whatever it depends on.
    pub fn set_heater_on(&mut self, on: bool) {
        if !on {
            self.actuator.write(DeviceId::Heater, false);
            if self.mode == Mode::HotTub {
                self.actuator.write(DeviceId::HeaterPump, false);
            }
            return;
        }

        self.set_filter_on(true);
        if self.mode == Mode::HotTub {
            self.actuator.write(DeviceId::HeaterPump, true);
        }
        self.actuator.write(DeviceId::Heater, true);

        if !self.is_on(DeviceId::Filter) {
            warn!("filter did not come on, heater reverted");
            self.set_heater_on(false);
        } else if self.mode == Mode::HotTub && !self.is_on(DeviceId::HeaterPump) {
            warn!("heater pump did not come on, heater reverted");
            self.set_heater_on(false);
        }
    }

    // ── Quick dose ────────────────────────────────────────────────────────────

    /// Run the chlorine pump for `dose_ml` starting now.
    ///
    /// A dose already in progress is replaced.  Returns the time of day the
    /// dose ends.
    pub fn quick_dose(&mut self, dose_ml: u32, now: NaiveDateTime) -> Result<ClockTime, ControlError> {
        if !(dose::MIN_DOSE_ML..=dose::MAX_QUICK_DOSE_ML).contains(&dose_ml) {
            return Err(ControlError::RejectedDose {
                dose_ml,
                min_ml: dose::MIN_DOSE_ML,
                max_ml: dose::MAX_QUICK_DOSE_ML,
            });
        }

        self.cancel_quick_dose();

        let duration = dose::to_duration(dose_ml);
        let stop_time = ClockTime::from_naive_time(now.time()) + duration;
        let mut delay = stop_time.until_next_occurrence(now);
        if delay.is_zero() {
            // Full-day dose started exactly on the minute
            delay = std::time::Duration::from_secs(24 * 3600);
        }

        self.set_filter_on(true);
        self.set_chlorine_on(true);

        self.next_dose_id += 1;
        let id = self.next_dose_id;
        let timer = self.timers.arm(delay, TimerEvent::QuickDoseExpired { id });
        self.quick_dose = Some(QuickDose { id, stop_time, timer });

        info!(dose_ml, stop = %stop_time, "quick dose started");
        Ok(stop_time)
    }

    pub fn quick_dose_stop_time(&self) -> Option<ClockTime> {
        self.quick_dose.as_ref().map(|q| q.stop_time)
    }

    pub fn is_quick_dosing(&self) -> bool {
        self.quick_dose.is_some()
    }

    /// Handle expiry of quick dose `id`.
    ///
    /// Chlorine and filter go back to whatever the stored schedule says for
    /// the stop time.  Expiry of a superseded dose is ignored.
    pub fn finish_quick_dose(&mut self, id: u64, schedules: &Schedules) -> bool {
        let stop_time = match &self.quick_dose {
            Some(q) if q.id == id => q.stop_time,
            _ => {
                debug!(id, "stale quick dose expiry ignored");
                return false;
            }
        };
        self.quick_dose = None;

        self.set_chlorine_on(schedules.is_scheduled(DeviceKind::Chlorine, stop_time));
        self.set_filter_on(schedules.is_scheduled(DeviceKind::Filter, stop_time));
        info!(stop = %stop_time, "quick dose finished");
        true
    }

    fn cancel_quick_dose(&mut self) {
        if let Some(q) = self.quick_dose.take() {
            q.timer.cancel();
            debug!(stop = %q.stop_time, "quick dose cancelled");
        }
    }

    // ── Schedules ─────────────────────────────────────────────────────────────

    /// Switch devices for a boundary that came due.
    pub fn apply_boundary(&mut self, boundary: &Boundary, schedules: &Schedules) {
        match (boundary.kind, boundary.edge) {
            (DeviceKind::Chlorine, Edge::Start) => {
                self.set_filter_on(true);
                self.set_chlorine_on(true);
            }
            (DeviceKind::Chlorine, Edge::Stop) => {
                if self.is_quick_dosing() {
                    debug!("chlorine stop deferred to running quick dose");
                    return;
                }
                self.set_chlorine_on(false);
                self.set_filter_on(schedules.is_scheduled(DeviceKind::Filter, boundary.stop));
            }
            (DeviceKind::Filter, Edge::Start) => {
                self.set_filter_on(true);
            }
            (DeviceKind::Filter, Edge::Stop) => {
                self.set_filter_on(false);
            }
            (DeviceKind::Heater, Edge::Start) => {
                self.set_filter_on(true);
                self.set_heater_on(true);
            }
            (DeviceKind::Heater, Edge::Stop) => {
                self.set_heater_on(false);
                self.set_filter_on(schedules.is_scheduled(DeviceKind::Filter, boundary.stop));
            }
        }
    }

    /// Bring every enabled device in line with the schedule at `now`.
    ///
    /// Chlorine is left alone while a quick dose runs.
    pub fn apply_schedules_now(&mut self, schedules: &Schedules, now: ClockTime) {
        for kind in [DeviceKind::Chlorine, DeviceKind::Heater, DeviceKind::Filter] {
            if !schedules.is_enabled(kind) {
                continue;
            }
            let on = schedules.is_scheduled(kind, now);
            match kind {
                DeviceKind::Chlorine if self.is_quick_dosing() => {}
                DeviceKind::Chlorine => {
                    if on {
                        self.set_filter_on(true);
                    }
                    self.set_chlorine_on(on);
                }
                DeviceKind::Heater => {
                    if on {
                        self.set_filter_on(true);
                    }
                    self.set_heater_on(on);
                }
                DeviceKind::Filter => {
                    self.set_filter_on(on);
                }
            }
        }
        debug!(at = %now, states = ?self.device_states(), "schedules applied");
    }

    // ── Temperature control ───────────────────────────────────────────────────

    pub fn temperature_control_enabled(&self) -> bool {
        self.temperature_control
    }

    pub fn set_temperature_control_enabled(&mut self, enabled: bool) {
        if self.temperature_control != enabled {
            info!(enabled, "temperature control toggled");
        }
        self.temperature_control = enabled;
    }

    /// Drive the heater from the water temperature when control is enabled.
    ///
    /// Returns whether the heater was switched.
    pub fn on_temperatures(&mut self, readings: &Temperatures, goal: f32) -> bool {
        if !self.temperature_control {
            return false;
        }
        let Some(water) = readings.water else {
            return false;
        };

        let heater_on = self.is_on(DeviceId::Heater);
        if water < goal - HEATER_HYSTERESIS_C && !heater_on {
            info!(water, goal, "water below goal, heater on");
            self.set_heater_on(true);
            true
        } else if water >= goal && heater_on {
            info!(water, goal, "goal reached, heater off");
            self.set_heater_on(false);
            true
        } else {
            false
        }
    }

    /// Cancel the quick dose timer and release every output.
    pub fn shutdown(&mut self) {
        self.cancel_quick_dose();
        self.actuator.release_all();
        info!("outputs released");
    }
}
