/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-device interval stores.
//!
//! An [`IntervalStore`] maps a start [`ClockTime`] to the interval's extent:
//! an explicit stop time for filter and heater, a [`DoseMl`] for chlorine
//! (whose stop time is derived, never stored).
//!
//! Overlap is rejected at insertion time only.  The check is deliberately
//! conservative: a new interval is stored only when **both** of its endpoints
//! lie outside every existing window, using the closed membership test of
//! [`in_window`].  Two intervals that merely touch (one's stop equal to the
//! other's start) are therefore rejected.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::dose::DoseMl;
use crate::time::ClockTime;

// ── Window membership ─────────────────────────────────────────────────────────

/// Whether `time` lies within the window `start..=stop`.
///
/// A window whose stop is before its start wraps past midnight and is tested
/// as `time > start || time < stop`; otherwise both ends are inclusive.
pub fn in_window(time: ClockTime, start: ClockTime, stop: ClockTime) -> bool {
    if stop < start {
        time > start || time < stop
    } else {
        start <= time && time <= stop
    }
}

// ── Extent ────────────────────────────────────────────────────────────────────

/// What an interval stores besides its start.
pub trait Extent: Copy + fmt::Debug {
    /// Stop time of an interval starting at `start`.
    fn stop_from(&self, start: ClockTime) -> ClockTime;

    /// Per-entry validity, checked before any overlap test.
    fn is_admissible(&self) -> bool {
        true
    }
}

impl Extent for ClockTime {
    fn stop_from(&self, _start: ClockTime) -> ClockTime {
        *self
    }
}

impl Extent for DoseMl {
    fn stop_from(&self, start: ClockTime) -> ClockTime {
        start + self.duration()
    }

    fn is_admissible(&self) -> bool {
        self.is_meterable()
    }
}

// ── IntervalStore ─────────────────────────────────────────────────────────────

/// Non-overlapping time windows for one device kind.
///
/// Entries are kept in a `BTreeMap`, so iteration is ordered by start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalStore<E> {
    entries: BTreeMap<ClockTime, E>,
}

impl<E> Default for IntervalStore<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: Extent> IntervalStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the interval `(start, extent)` unless it is rejected.
    ///
    /// Rejections are silent no-ops; the return value says whether the
    /// interval was stored:
    /// * `start` is already a key,
    /// * the extent is not admissible (chlorine dose outside the pump range),
    /// * `start` or the derived stop falls inside an existing window.
    pub fn add(&mut self, start: ClockTime, extent: E) -> bool {
        if self.entries.contains_key(&start) {
            debug!(start = %start, "interval rejected: duplicate start");
            return false;
        }
        if !extent.is_admissible() {
            debug!(start = %start, extent = ?extent, "interval rejected: extent not admissible");
            return false;
        }

        let stop = extent.stop_from(start);
        if !self.entries.is_empty() && (self.contains(start) || self.contains(stop)) {
            debug!(start = %start, stop = %stop, "interval rejected: overlaps an existing window");
            return false;
        }

        self.entries.insert(start, extent);
        debug!(start = %start, stop = %stop, "interval stored");
        true
    }

    /// Delete the interval starting at `start`.  Absent keys are a no-op.
    pub fn remove(&mut self, start: ClockTime) -> bool {
        self.entries.remove(&start).is_some()
    }

    /// Whether `time` lies within any stored window.
    pub fn contains(&self, time: ClockTime) -> bool {
        self.windows().any(|(start, stop)| in_window(time, start, stop))
    }

    /// `(start, extent)` pairs, ordered by start.
    pub fn entries(&self) -> impl Iterator<Item = (ClockTime, E)> + '_ {
        self.entries.iter().map(|(start, extent)| (*start, *extent))
    }

    /// `(start, stop)` pairs with the stop derived from each extent.
    pub fn windows(&self) -> impl Iterator<Item = (ClockTime, ClockTime)> + '_ {
        self.entries
            .iter()
            .map(|(start, extent)| (*start, extent.stop_from(*start)))
    }

    /// Extent stored for `start`, if any.
    pub fn get(&self, start: ClockTime) -> Option<E> {
        self.entries.get(&start).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from previously persisted entries.
    ///
    /// Stored entries are trusted for overlap: replaying them through the
    /// conservative [`add`](Self::add) in key order can reject an interval
    /// that was accepted in a different insertion order.  Entries that are
    /// not admissible on their own are dropped.
    pub fn from_stored(raw: BTreeMap<ClockTime, E>) -> Self {
        let entries = raw
            .into_iter()
            .filter(|(start, extent)| {
                let ok = extent.is_admissible();
                if !ok {
                    warn!(start = %start, extent = ?extent, "dropping inadmissible stored interval");
                }
                ok
            })
            .collect();
        Self { entries }
    }
}

// ── Serde ─────────────────────────────────────────────────────────────────────

impl<E: Serialize> Serialize for IntervalStore<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, E: Extent + Deserialize<'de>> Deserialize<'de> for IntervalStore<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<ClockTime, E>::deserialize(deserializer)?;
        Ok(Self::from_stored(raw))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::dose::{MAX_QUICK_DOSE_ML, MAX_SCHEDULED_DOSE_ML};

    fn t(text: &str) -> ClockTime {
        ClockTime::from_text(text).unwrap()
    }

    // ── in_window ─────────────────────────────────────────────────────────────

    #[test]
    fn wrapping_window_membership() {
        let (start, stop) = (t("22:00"), t("05:00"));
        assert!(in_window(t("02:00"), start, stop));
        assert!(in_window(t("23:30"), start, stop));
        assert!(!in_window(t("12:00"), start, stop));
    }

    #[test]
    fn plain_window_is_closed_at_both_ends() {
        let (start, stop) = (t("08:00"), t("10:00"));
        assert!(in_window(t("08:00"), start, stop));
        assert!(in_window(t("10:00"), start, stop));
        assert!(!in_window(t("07:59"), start, stop));
        assert!(!in_window(t("10:01"), start, stop));
    }

    // ── Filter / heater stores ────────────────────────────────────────────────

    #[test]
    fn contains_on_wrapping_stored_window() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("22:00"), t("05:00")));

        assert!(store.contains(t("02:00")));
        assert!(!store.contains(t("12:00")));
        assert!(store.contains(t("22:00")), "closed start");
        assert!(store.contains(t("05:00")), "closed stop");
    }

    #[test]
    fn overlapping_add_is_rejected() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("22:00"), t("05:00")));
        assert!(!store.add(t("23:00"), t("04:00")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("08:00"), t("09:00")));
        assert!(!store.add(t("08:00"), t("08:30")));
        assert_eq!(store.get(t("08:00")), Some(t("09:00")));
    }

    #[test]
    fn disjoint_intervals_are_accepted() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("08:00"), t("09:00")));
        assert!(store.add(t("12:00"), t("13:00")));
        assert!(store.add(t("22:00"), t("02:00")));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn touching_intervals_are_rejected() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("08:00"), t("09:00")));
        assert!(!store.add(t("09:00"), t("10:00")), "start on existing stop");
        assert!(!store.add(t("07:00"), t("08:00")), "stop on existing start");
    }

    #[test]
    fn enclosing_interval_is_only_checked_by_endpoints() {
        let mut store = IntervalStore::new();
        assert!(store.add(t("10:00"), t("11:00")));
        // Both endpoints of the new window lie outside 10:00–11:00.
        assert!(store.add(t("09:00"), t("12:00")));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = IntervalStore::new();
        store.add(t("08:00"), t("09:00"));
        assert!(store.remove(t("08:00")));
        assert!(!store.remove(t("08:00")));
        assert!(store.is_empty());
        assert!(!store.contains(t("08:30")));
    }

    #[test]
    fn entries_are_ordered_by_start() {
        let mut store = IntervalStore::new();
        store.add(t("20:00"), t("21:00"));
        store.add(t("06:00"), t("07:00"));
        let starts: Vec<_> = store.entries().map(|(s, _)| s).collect();
        assert_eq!(starts, vec![t("06:00"), t("20:00")]);
    }

    // ── Chlorine store ────────────────────────────────────────────────────────

    #[test]
    fn chlorine_dose_minimum() {
        let mut store = IntervalStore::new();
        assert!(!store.add(t("08:00"), DoseMl(15)));
        assert!(store.is_empty());
        assert!(store.add(t("08:00"), DoseMl(16)));
    }

    #[test]
    fn chlorine_stop_is_derived_from_dose() {
        let mut store = IntervalStore::new();
        store.add(t("08:00"), DoseMl(960));
        let windows: Vec<_> = store.windows().collect();
        assert_eq!(windows, vec![(t("08:00"), t("09:00"))]);
        assert!(store.contains(t("09:00")));
        assert!(!store.contains(t("09:01")));
    }

    #[test]
    fn chlorine_overlap_uses_derived_stop() {
        let mut store = IntervalStore::new();
        store.add(t("08:00"), DoseMl(960)); // 08:00–09:00
        // 07:30 + 60 min = 08:30 lands inside the first window
        assert!(!store.add(t("07:30"), DoseMl(960)));
        // 06:00 + 30 min = 06:30 is clear
        assert!(store.add(t("06:00"), DoseMl(480)));
    }

    #[test]
    fn chlorine_dose_wrapping_past_midnight() {
        let mut store = IntervalStore::new();
        store.add(t("23:30"), DoseMl(960)); // 23:30 → 00:30
        assert!(store.contains(t("00:15")));
        assert!(!store.contains(t("01:00")));
    }

    // ── Serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn serialises_as_time_keyed_map() {
        let mut store = IntervalStore::new();
        store.add(t("22:00"), t("05:00"));
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"22:00":"05:00"}"#);

        let back: IntervalStore<ClockTime> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn loading_keeps_stored_entries_regardless_of_order() {
        // Accepted in the order 10:00 then 09:00; key order would reject 10:00.
        let json = r#"{"09:00":"12:00","10:00":"11:00"}"#;
        let store: IntervalStore<ClockTime> = serde_json::from_str(json).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn chlorine_dose_ceiling() {
        let mut store = IntervalStore::new();
        assert!(!store.add(t("08:00"), DoseMl(MAX_QUICK_DOSE_ML)));
        assert!(!store.add(t("08:00"), DoseMl(1_000_000)));
        assert!(store.is_empty());

        // 1439 minutes: 08:00 until 07:59 the next morning
        assert!(store.add(t("08:00"), DoseMl(MAX_SCHEDULED_DOSE_ML)));
        assert_eq!(store.windows().collect::<Vec<_>>(), vec![(t("08:00"), t("07:59"))]);
        assert!(store.contains(t("12:00")));
    }

    #[test]
    fn loading_drops_inadmissible_doses() {
        let json = r#"{"08:00":10,"12:00":320}"#;
        let store: IntervalStore<DoseMl> = serde_json::from_str(json).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(t("12:00")), Some(DoseMl(320)));
    }
}
