/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! poolctl – pool / hot-tub equipment controller
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── time/        – minute-of-day ClockTime, wall clock (system / fake)
//! ├── schedule/    – IntervalStore, dose conversion, Schedules
//! ├── device/      – Actuator trait, sysfs GPIO, simulation, 1-Wire sensors
//! ├── controller/  – interlocks, boundary timers, commands, control loop
//! ├── persist/     – schedule storage (JSON file, in-memory)
//! ├── channel/     – TCP JSON-lines command channel
//! └── config/      – YAML controller configuration
//! ```

pub mod channel;
pub mod config;
pub mod controller;
pub mod device;
pub mod persist;
pub mod schedule;
pub mod time;
