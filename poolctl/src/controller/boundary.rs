/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Boundary timers for the stored schedules.
//!
//! Every refresh throws away all armed timers and arms exactly one timer per
//! window start and one per window stop, each for the next wall-clock
//! occurrence of that time of day.  Timers armed by an earlier refresh carry
//! an older generation and are ignored if their event is already in flight.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::interlock::InterlockController;
use super::timer::{Boundary, Edge, TimerEvent, TimerHandle, Timers};
use crate::schedule::{DeviceKind, Schedules};

/// Every boundary of every stored window, regardless of enabled flags.
pub fn boundaries(schedules: &Schedules) -> Vec<Boundary> {
    DeviceKind::ALL
        .iter()
        .flat_map(|&kind| {
            schedules
                .windows(kind)
                .into_iter()
                .flat_map(move |(start, stop)| {
                    [Edge::Start, Edge::Stop].map(|edge| Boundary {
                        kind,
                        edge,
                        start,
                        stop,
                    })
                })
        })
        .collect()
}

pub struct BoundaryScheduler {
    timers: Timers,
    armed: Vec<TimerHandle>,
    generation: u64,
}

impl BoundaryScheduler {
    pub fn new(timers: Timers) -> Self {
        Self {
            timers,
            armed: Vec::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Cancel every armed timer and arm the boundaries of `schedules`
    /// relative to `now`.
    pub fn refresh(&mut self, schedules: &Schedules, now: NaiveDateTime) {
        self.cancel_all();
        self.generation += 1;

        for boundary in boundaries(schedules) {
            let delay = boundary.at().until_next_occurrence(now);
            debug!(
                kind = %boundary.kind,
                edge = ?boundary.edge,
                at = %boundary.at(),
                delay_ms = delay.as_millis() as u64,
                "arming boundary"
            );
            let event = TimerEvent::Boundary {
                generation: self.generation,
                boundary,
            };
            self.armed.push(self.timers.arm(delay, event));
        }

        info!(
            generation = self.generation,
            timers = self.armed.len(),
            "schedule timers refreshed"
        );
    }

    pub fn cancel_all(&mut self) {
        for handle in self.armed.drain(..) {
            handle.cancel();
        }
    }

    /// Act on a due boundary.
    ///
    /// Returns `false` when the event belongs to a superseded refresh or the
    /// kind's schedule is disabled; nothing is switched in that case.
    pub fn fire(
        &self,
        generation: u64,
        boundary: &Boundary,
        schedules: &Schedules,
        interlock: &mut InterlockController,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "stale boundary ignored");
            return false;
        }
        if !schedules.is_enabled(boundary.kind) {
            debug!(kind = %boundary.kind, "boundary ignored: schedule disabled");
            return false;
        }

        info!(kind = %boundary.kind, edge = ?boundary.edge, at = %boundary.at(), "boundary reached");
        interlock.apply_boundary(boundary, schedules);
        true
    }
}
