/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors surfaced to command senders.
//!
//! Interval rejections are not errors: adding an overlapping or duplicate
//! interval is a silent no-op and the caller sees the unchanged schedule in
//! the returned state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Quick dose outside what the chlorine pump can meter within a day.
    #[error("dose of {dose_ml} mL is outside the pump range {min_ml}..={max_ml} mL")]
    RejectedDose {
        dose_ml: u32,
        min_ml: u32,
        max_ml: u32,
    },

    /// The control loop is no longer running.
    #[error("controller is not running")]
    Stopped,
}
