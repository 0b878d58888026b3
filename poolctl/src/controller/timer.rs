/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! One-shot timers that post events back into the control loop.
//!
//! A timer is a spawned task that sleeps and then sends its event on an
//! unbounded channel.  The control loop owns the receiving end, so timer
//! callbacks never touch controller state directly.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::schedule::DeviceKind;
use crate::time::ClockTime;

/// Which end of a window a boundary marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    Stop,
}

/// One start or stop moment of a stored window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub kind: DeviceKind,
    pub edge: Edge,
    pub start: ClockTime,
    pub stop: ClockTime,
}

impl Boundary {
    /// Time of day this boundary fires.
    pub fn at(&self) -> ClockTime {
        match self.edge {
            Edge::Start => self.start,
            Edge::Stop => self.stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A boundary armed during refresh `generation` came due.
    Boundary { generation: u64, boundary: Boundary },
    /// The quick dose with this id ran its course.
    QuickDoseExpired { id: u64 },
}

/// Cancellation handle for an armed timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Arms timers that report to one control loop.
#[derive(Debug, Clone)]
pub struct Timers {
    tx: mpsc::UnboundedSender<TimerEvent>,
}

impl Timers {
    pub fn new(tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self { tx }
    }

    /// Post `event` after `delay`.  Must be called inside a tokio runtime.
    pub fn arm(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the loop has shut down
            let _ = tx.send(event);
        });
        TimerHandle { task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_posts_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = Timers::new(tx);
        let _h = timers.arm(Duration::from_secs(60), TimerEvent::QuickDoseExpired { id: 7 });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().unwrap(), TimerEvent::QuickDoseExpired { id: 7 });
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_stays_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = Timers::new(tx);
        timers
            .arm(Duration::from_secs(1), TimerEvent::QuickDoseExpired { id: 1 })
            .cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn boundary_at_follows_edge() {
        let start = ClockTime::from_hm(9, 0).unwrap();
        let stop = ClockTime::from_hm(10, 0).unwrap();
        let mut b = Boundary {
            kind: DeviceKind::Filter,
            edge: Edge::Start,
            start,
            stop,
        };
        assert_eq!(b.at(), start);
        b.edge = Edge::Stop;
        assert_eq!(b.at(), stop);
    }
}
