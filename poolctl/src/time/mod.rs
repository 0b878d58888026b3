/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-of-day values for the repeating 24-hour schedule.
//!
//! [`ClockTime`] is a plain `Copy` value holding minutes since midnight in
//! `[0, 1440]`.  `1440` is the end-of-day sentinel (`24:00`) and is only ever
//! produced by explicit construction or by arithmetic that lands exactly on
//! it.
//!
//! Arithmetic follows the controller's day-wraparound convention rather than
//! true modular arithmetic:
//!
//! | Operation | Rule |
//! |---|---|
//! | `a + b` | sum, minus 1440 if the sum **exceeds** 1440 |
//! | `a - b` | difference, or `1440 - b` if the difference is negative |
//!
//! The boundary maths in [`crate::schedule`] and [`crate::controller`] depends
//! on exactly these rules.

pub mod clock;

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use clock::{FakeClock, SystemClock, WallClock};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Minutes in one schedule cycle.
pub const MINUTES_PER_DAY: u16 = 1440;

const MILLIS_PER_DAY: i64 = 86_400_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Caller-visible failures when building a [`ClockTime`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockTimeError {
    /// Minute value outside `[0, 1440]`.
    #[error("{0} minutes is outside the day range 0..=1440")]
    OutOfRange(i64),

    /// Text that is not of the form `HH:MM`.
    #[error("cannot parse '{0}' as HH:MM")]
    Parse(String),
}

// ── ClockTime ─────────────────────────────────────────────────────────────────

/// A time of day in whole minutes since 00:00.
///
/// Equality, ordering and hashing are by minute value, so a `ClockTime` is
/// used directly as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    /// 00:00.
    pub const MIDNIGHT: ClockTime = ClockTime { minutes: 0 };

    /// 24:00, the end-of-day sentinel.
    pub const END_OF_DAY: ClockTime = ClockTime {
        minutes: MINUTES_PER_DAY,
    };

    /// Build from a raw minute count.
    ///
    /// # Errors
    /// [`ClockTimeError::OutOfRange`] if `minutes < 0` or `minutes > 1440`.
    pub fn from_minutes(minutes: i64) -> Result<Self, ClockTimeError> {
        if !(0..=i64::from(MINUTES_PER_DAY)).contains(&minutes) {
            return Err(ClockTimeError::OutOfRange(minutes));
        }
        Ok(Self {
            minutes: minutes as u16,
        })
    }

    /// Build from hours and minutes.  The minute part must be below 60.
    pub fn from_hm(hours: u32, minutes: u32) -> Result<Self, ClockTimeError> {
        if minutes >= 60 {
            return Err(ClockTimeError::Parse(format!("{hours}:{minutes}")));
        }
        Self::from_minutes(i64::from(hours) * 60 + i64::from(minutes))
    }

    /// Parse `"HH:MM"` (single-digit hours are accepted, e.g. `"7:05"`).
    ///
    /// # Errors
    /// * [`ClockTimeError::Parse`] for anything that is not two numeric
    ///   fields separated by a colon, or a minute field of 60 or more.
    /// * [`ClockTimeError::OutOfRange`] for well-formed text past `24:00`.
    pub fn from_text(text: &str) -> Result<Self, ClockTimeError> {
        let parse_err = || ClockTimeError::Parse(text.to_string());

        let (h, m) = text.trim().split_once(':').ok_or_else(parse_err)?;
        if h.is_empty() || m.is_empty() {
            return Err(parse_err());
        }
        let hours: u32 = h.parse().map_err(|_| parse_err())?;
        let minutes: u32 = m.parse().map_err(|_| parse_err())?;

        if minutes >= 60 {
            return Err(parse_err());
        }
        Self::from_minutes(i64::from(hours) * 60 + i64::from(minutes))
    }

    /// Minutes since midnight.
    pub const fn minutes(self) -> u16 {
        self.minutes
    }

    /// Truncate a wall-clock time to the minute.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    /// The current time of day according to `clock`, truncated to the minute.
    pub fn now(clock: &dyn WallClock) -> Self {
        Self::from_naive_time(clock.now().time())
    }

    /// Milliseconds from `now` until the next wall-clock moment matching this
    /// time of day.
    ///
    /// Today's occurrence is used while it is still ahead of (or exactly at)
    /// `now`; otherwise the same time tomorrow.  `24:00` is tomorrow's
    /// midnight.  The result is never negative.
    pub fn millis_until_next_occurrence(self, now: NaiveDateTime) -> u64 {
        let today = now.date().and_time(NaiveTime::MIN);
        let target = today + TimeDelta::minutes(i64::from(self.minutes));

        let mut millis = (target - now).num_milliseconds();
        if millis < 0 {
            millis += MILLIS_PER_DAY;
        }
        millis.max(0) as u64
    }

    /// [`millis_until_next_occurrence`](Self::millis_until_next_occurrence)
    /// as a [`Duration`] ready for a timer.
    pub fn until_next_occurrence(self, now: NaiveDateTime) -> Duration {
        Duration::from_millis(self.millis_until_next_occurrence(now))
    }
}

impl Add for ClockTime {
    type Output = ClockTime;

    fn add(self, other: ClockTime) -> ClockTime {
        let mut minutes = self.minutes + other.minutes;
        if minutes > MINUTES_PER_DAY {
            minutes -= MINUTES_PER_DAY;
        }
        ClockTime { minutes }
    }
}

impl Sub for ClockTime {
    type Output = ClockTime;

    fn sub(self, other: ClockTime) -> ClockTime {
        let minutes = if self.minutes >= other.minutes {
            self.minutes - other.minutes
        } else {
            MINUTES_PER_DAY - other.minutes
        };
        ClockTime { minutes }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl FromStr for ClockTime {
    type Err = ClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl TryFrom<i64> for ClockTime {
    type Error = ClockTimeError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

// ── Serde ─────────────────────────────────────────────────────────────────────

// Serialised as "HH:MM" so it can also be a JSON object key.  Deserialisation
// accepts either the text form or a bare minute count.

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct ClockTimeVisitor;

impl<'de> Visitor<'de> for ClockTimeVisitor {
    type Value = ClockTime;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a time of day as \"HH:MM\" or minutes since midnight")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ClockTime, E> {
        ClockTime::from_text(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ClockTime, E> {
        ClockTime::from_minutes(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ClockTime, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(ClockTimeError::OutOfRange(i64::MAX)))?;
        ClockTime::from_minutes(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ClockTimeVisitor)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(text: &str) -> ClockTime {
        ClockTime::from_text(text).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn from_minutes_round_trips_whole_range() {
        for m in 0..=1440 {
            assert_eq!(ClockTime::from_minutes(m).unwrap().minutes() as i64, m);
        }
    }

    #[test]
    fn from_minutes_rejects_out_of_range() {
        assert_eq!(
            ClockTime::from_minutes(-1),
            Err(ClockTimeError::OutOfRange(-1))
        );
        assert_eq!(
            ClockTime::from_minutes(1441),
            Err(ClockTimeError::OutOfRange(1441))
        );
    }

    #[test]
    fn from_text_parses_hours_and_minutes() {
        assert_eq!(t("00:00").minutes(), 0);
        assert_eq!(t("07:05").minutes(), 425);
        assert_eq!(t("7:05").minutes(), 425);
        assert_eq!(t("23:59").minutes(), 1439);
        assert_eq!(t("24:00"), ClockTime::END_OF_DAY);
    }

    #[test]
    fn from_text_rejects_malformed_input() {
        for bad in ["", "12", "ab:cd", "12:", ":30", "12:60", "1:2:3", "-1:00"] {
            assert!(
                matches!(ClockTime::from_text(bad), Err(ClockTimeError::Parse(_))),
                "{bad:?} should be a parse error"
            );
        }
    }

    #[test]
    fn from_text_past_end_of_day_is_out_of_range() {
        assert_eq!(
            ClockTime::from_text("25:00"),
            Err(ClockTimeError::OutOfRange(1500))
        );
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(t("7:05").to_string(), "07:05");
        assert_eq!(ClockTime::END_OF_DAY.to_string(), "24:00");
    }

    #[test]
    fn from_naive_time_truncates_seconds() {
        let time = NaiveTime::from_hms_opt(13, 45, 59).unwrap();
        assert_eq!(ClockTime::from_naive_time(time), t("13:45"));
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    #[test]
    fn add_wraps_past_midnight() {
        let a = ClockTime::from_minutes(23 * 60 + 50).unwrap();
        let b = ClockTime::from_minutes(20).unwrap();
        assert_eq!(a + b, ClockTime::from_minutes(10).unwrap());
    }

    #[test]
    fn add_landing_exactly_on_end_of_day_is_not_wrapped() {
        assert_eq!(t("23:00") + t("01:00"), ClockTime::END_OF_DAY);
    }

    #[test]
    fn subtract_without_underflow() {
        assert_eq!(t("10:30") - t("00:45"), t("09:45"));
    }

    #[test]
    fn subtract_underflow_uses_day_wraparound_convention() {
        // 01:00 - 02:00 → 1440 - 120, not 23:00
        assert_eq!(t("01:00") - t("02:00"), ClockTime::from_minutes(1320).unwrap());
        // 00:10 - 23:00 → 1440 - 1380 = 60
        assert_eq!(t("00:10") - t("23:00"), t("01:00"));
    }

    #[test]
    fn ordering_is_by_minute_value() {
        assert!(t("08:00") < t("08:01"));
        assert!(ClockTime::MIDNIGHT < ClockTime::END_OF_DAY);
    }

    // ── Deadlines ─────────────────────────────────────────────────────────────

    #[test]
    fn next_occurrence_later_today() {
        let now = at(10, 0, 0);
        assert_eq!(t("10:30").millis_until_next_occurrence(now), 30 * 60_000);
    }

    #[test]
    fn next_occurrence_already_passed_is_tomorrow() {
        let now = at(10, 0, 0);
        assert_eq!(
            t("09:00").millis_until_next_occurrence(now),
            23 * 3_600_000
        );
    }

    #[test]
    fn next_occurrence_within_current_minute_rolls_to_tomorrow() {
        let now = at(10, 0, 30);
        assert_eq!(
            t("10:00").millis_until_next_occurrence(now),
            86_400_000 - 30_000
        );
    }

    #[test]
    fn next_occurrence_exactly_now_is_zero() {
        assert_eq!(t("10:00").millis_until_next_occurrence(at(10, 0, 0)), 0);
    }

    #[test]
    fn end_of_day_is_next_midnight() {
        let now = at(23, 0, 0);
        assert_eq!(
            ClockTime::END_OF_DAY.millis_until_next_occurrence(now),
            3_600_000
        );
        assert_eq!(
            ClockTime::END_OF_DAY.until_next_occurrence(now),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn next_occurrence_is_never_more_than_a_day() {
        let now = at(0, 0, 1);
        for m in (0..=1440).step_by(17) {
            let ms = ClockTime::from_minutes(m).unwrap().millis_until_next_occurrence(now);
            assert!(ms <= 86_400_000 + 60_000, "{m}: {ms}");
        }
    }

    #[test]
    fn now_reads_the_wall_clock() {
        let clock = FakeClock::new(at(14, 7, 42));
        assert_eq!(ClockTime::now(&clock), t("14:07"));
    }

    // ── Serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&t("06:30")).unwrap();
        assert_eq!(json, "\"06:30\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t("06:30"));
    }

    #[test]
    fn serde_accepts_minute_count() {
        let v: ClockTime = serde_json::from_str("390").unwrap();
        assert_eq!(v, t("06:30"));
        assert!(serde_json::from_str::<ClockTime>("1441").is_err());
    }
}
