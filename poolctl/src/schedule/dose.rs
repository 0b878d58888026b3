/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Chlorine dose → pump run time.
//!
//! The dosing pump meters 0.96 L/h, i.e. exactly 16 mL per minute.  Doses are
//! whole millilitres and run times whole minutes; fractional minutes are
//! truncated.

use serde::{Deserialize, Serialize};

use crate::time::{ClockTime, MINUTES_PER_DAY};

/// Pump delivery rate in mL per minute (0.96 L/h).
pub const ML_PER_MINUTE: u32 = 16;

/// Smallest volume the pump can meter.
pub const MIN_DOSE_ML: u32 = 16;

/// Largest quick dose: one full day of pumping.
pub const MAX_QUICK_DOSE_ML: u32 = MINUTES_PER_DAY as u32 * ML_PER_MINUTE;

/// Largest dose a daily chlorine window can hold.  A full-day dose would end
/// where it starts.
pub const MAX_SCHEDULED_DOSE_ML: u32 = MAX_QUICK_DOSE_ML - 1;

/// Run time for `dose_ml`, clamped to one full day.
pub fn to_duration(dose_ml: u32) -> ClockTime {
    let minutes = (dose_ml / ML_PER_MINUTE).min(u32::from(MINUTES_PER_DAY));
    // Clamped into range above
    ClockTime::from_minutes(i64::from(minutes)).unwrap_or(ClockTime::END_OF_DAY)
}

/// A chlorine dose in millilitres; the extent of a chlorine interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoseMl(pub u32);

impl DoseMl {
    /// Pump run time for this dose.
    pub fn duration(self) -> ClockTime {
        to_duration(self.0)
    }

    /// Whether the pump can meter this dose within one daily window.
    pub fn is_meterable(self) -> bool {
        (MIN_DOSE_ML..=MAX_SCHEDULED_DOSE_ML).contains(&self.0)
    }
}
