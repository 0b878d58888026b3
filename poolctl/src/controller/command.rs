/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Commands accepted by the control loop and the state it reports back.
//!
//! The command set is closed: anything that does not deserialize into a
//! [`Command`] is refused at the channel before it reaches the loop.
//!
//! ```json
//! {"command":"add_filter_interval","start":"09:00","stop":"11:30"}
//! {"command":"quick_dose","dose_ml":100}
//! {"command":"set_schedule_enabled","device":"heater","enabled":false}
//! ```

use serde::{Deserialize, Serialize};

use super::interlock::DeviceStates;
use crate::device::{Mode, Temperatures};
use crate::schedule::{DeviceKind, Schedules};
use crate::time::ClockTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SetChlorine { on: bool },
    SetFilter { on: bool },
    SetHeater { on: bool },
    SetScheduleEnabled { device: DeviceKind, enabled: bool },
    AddChlorineInterval { start: ClockTime, dose_ml: u32 },
    AddFilterInterval { start: ClockTime, stop: ClockTime },
    AddHeaterInterval { start: ClockTime, stop: ClockTime },
    RemoveInterval { device: DeviceKind, start: ClockTime },
    QuickDose { dose_ml: u32 },
    SetTemperatureControl { enabled: bool },
    SetGoalTemperature { celsius: f32 },
    GetState,
}

/// Everything a client needs to render the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub mode: Mode,
    #[serde(flatten)]
    pub devices: DeviceStates,
    pub schedules: Schedules,
    pub quick_dose_stop_time: Option<ClockTime>,
    pub temperatures: Temperatures,
    pub temperature_control: bool,
}

impl StateSnapshot {
    /// Snapshot of a controller that has not switched anything yet.
    pub fn idle(mode: Mode) -> Self {
        Self {
            mode,
            devices: DeviceStates::default(),
            schedules: Schedules::default(),
            quick_dose_stop_time: None,
            temperatures: Temperatures::default(),
            temperature_control: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_filter_interval() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"add_filter_interval","start":"09:00","stop":"11:30"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::AddFilterInterval {
                start: ClockTime::from_hm(9, 0).unwrap(),
                stop: ClockTime::from_hm(11, 30).unwrap(),
            }
        );
    }

    #[test]
    fn parse_minutes_as_clock_time() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"add_chlorine_interval","start":600,"dose_ml":160}"#).unwrap();
        assert_eq!(
            cmd,
            Command::AddChlorineInterval {
                start: ClockTime::from_hm(10, 0).unwrap(),
                dose_ml: 160,
            }
        );
    }

    #[test]
    fn parse_unit_command() {
        let cmd: Command = serde_json::from_str(r#"{"command":"get_state"}"#).unwrap();
        assert_eq!(cmd, Command::GetState);
    }

    #[test]
    fn unknown_command_is_refused() {
        assert!(serde_json::from_str::<Command>(r#"{"command":"reboot"}"#).is_err());
    }

    #[test]
    fn out_of_range_time_is_refused() {
        let raw = r#"{"command":"add_heater_interval","start":"25:00","stop":"26:00"}"#;
        assert!(serde_json::from_str::<Command>(raw).is_err());
    }

    #[test]
    fn snapshot_flattens_device_states() {
        let json = serde_json::to_value(StateSnapshot::idle(Mode::Pool)).unwrap();
        assert_eq!(json["mode"], "pool");
        assert_eq!(json["filter_on"], false);
        assert!(json["heater_pump_on"].is_null());
        assert!(json["quick_dose_stop_time"].is_null());
    }
}
