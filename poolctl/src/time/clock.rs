/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wall-clock source.
//!
//! Boundary deadlines are computed against local time of day, so the
//! controller reads "now" through [`WallClock`] instead of calling
//! `chrono::Local` directly.  Tests drive a [`FakeClock`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};

/// Source of the current local date and time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Real local-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Controllable clock for tests.  Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FakeClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl FakeClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(at)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::zero());
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += delta;
    }

    /// Jump to a specific instant.
    pub fn set(&self, at: NaiveDateTime) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = at;
    }
}

impl WallClock for FakeClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fake_clock_advances_across_midnight() {
        let clock = FakeClock::new(at(23, 50));
        clock.advance(Duration::from_secs(20 * 60));
        assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert_eq!(clock.now().time(), at(0, 10).time());
    }

    #[test]
    fn fake_clock_clones_share_time() {
        let a = FakeClock::new(at(8, 0));
        let b = a.clone();
        b.set(at(9, 30));
        assert_eq!(a.now(), at(9, 30));
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }
}
