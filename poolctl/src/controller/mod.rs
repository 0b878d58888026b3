/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The control loop.
//!
//! A single task owns the schedules, the interlock controller and the
//! boundary timers.  Everything that can change state reaches it as a
//! message:
//!
//! ```text
//!   channel ──Request──▶ ┐
//!   timers ──TimerEvent─▶├─▶ PoolController::run ──▶ Actuator
//!   daily tick / sensor poll ┘          │
//!                                       └─▶ watch<StateSnapshot>
//! ```
//!
//! A schedule mutation is stored, saved, the boundary timers re-armed, the
//! devices re-evaluated for the current minute, and finally a fresh
//! [`StateSnapshot`] published.

pub mod boundary;
pub mod command;
pub mod error;
pub mod interlock;
pub mod timer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub use boundary::BoundaryScheduler;
pub use command::{Command, StateSnapshot};
pub use error::ControlError;
pub use interlock::{DeviceStates, InterlockController};
pub use timer::{Boundary, Edge, TimerEvent, Timers};

use crate::device::{Actuator, Mode, SensorSource, Temperatures};
use crate::persist::ScheduleStore;
use crate::schedule::{DoseMl, Schedules};
use crate::time::{ClockTime, WallClock};

/// Boundary timers are re-armed this often even without mutations.
pub const DAILY_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

/// Depth of the command queue between channel and loop.
const REQUEST_QUEUE: usize = 32;

/// Runtime settings taken from the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub mode: Mode,
    pub temperature_control: bool,
    pub sensor_poll: Duration,
}

/// A command plus the slot its result is sent back on.
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Result<StateSnapshot, ControlError>>,
}

/// Cloneable front door to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<StateSnapshot>,
}

impl ControllerHandle {
    /// Submit `command` and wait for the resulting state.
    pub async fn send(&self, command: Command) -> Result<StateSnapshot, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_| ControlError::Stopped)?;
        rx.await.map_err(|_| ControlError::Stopped)?
    }

    /// Receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.state.clone()
    }

    pub fn current(&self) -> StateSnapshot {
        self.state.borrow().clone()
    }
}

pub struct PoolController {
    settings: ControllerSettings,
    schedules: Schedules,
    interlock: InterlockController,
    boundaries: BoundaryScheduler,
    store: Box<dyn ScheduleStore>,
    sensors: Box<dyn SensorSource>,
    clock: Arc<dyn WallClock>,
    temperatures: Temperatures,
    state_tx: watch::Sender<StateSnapshot>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    requests: mpsc::Receiver<Request>,
}

impl PoolController {
    /// Assemble a controller.  Stored schedules are loaded here; a store that
    /// cannot be read leaves the controller with empty schedules.
    pub fn new(
        settings: ControllerSettings,
        actuator: Box<dyn Actuator>,
        sensors: Box<dyn SensorSource>,
        mut store: Box<dyn ScheduleStore>,
        clock: Arc<dyn WallClock>,
    ) -> (Self, ControllerHandle) {
        let schedules = match store.load() {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to load schedules ({e}); starting with empty schedules");
                Schedules::default()
            }
        };

        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let timers = Timers::new(timer_tx);
        let interlock = InterlockController::new(
            actuator,
            settings.mode,
            timers.clone(),
            settings.temperature_control,
        );

        let (request_tx, requests) = mpsc::channel(REQUEST_QUEUE);
        let (state_tx, state_rx) = watch::channel(StateSnapshot::idle(settings.mode));

        let controller = Self {
            settings,
            schedules,
            interlock,
            boundaries: BoundaryScheduler::new(timers),
            store,
            sensors,
            clock,
            temperatures: Temperatures::default(),
            state_tx,
            timer_rx,
            requests,
        };
        let handle = ControllerHandle {
            requests: request_tx,
            state: state_rx,
        };
        (controller, handle)
    }

    pub fn schedules(&self) -> &Schedules {
        &self.schedules
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            mode: self.settings.mode,
            devices: self.interlock.device_states(),
            schedules: self.schedules.clone(),
            quick_dose_stop_time: self.interlock.quick_dose_stop_time(),
            temperatures: self.temperatures,
            temperature_control: self.interlock.temperature_control_enabled(),
        }
    }

    fn publish(&self) -> StateSnapshot {
        let snapshot = self.snapshot();
        self.state_tx.send_replace(snapshot.clone());
        snapshot
    }

    fn now_minute(&self) -> ClockTime {
        ClockTime::now(self.clock.as_ref())
    }

    /// Arm timers and bring devices in line with the schedule.
    pub fn start(&mut self) {
        info!(
            mode = ?self.settings.mode,
            intervals = self.schedules.interval_count(),
            "controller starting"
        );
        self.reschedule();
        self.publish();
    }

    /// Re-arm boundary timers and re-evaluate devices for the current minute.
    fn reschedule(&mut self) {
        let now = self.clock.now();
        self.boundaries.refresh(&self.schedules, now);
        self.interlock
            .apply_schedules_now(&self.schedules, ClockTime::from_naive_time(now.time()));
    }

    fn save(&mut self) {
        if let Err(e) = self.store.save(&self.schedules) {
            // The in-memory change stands; the next successful save catches up
            error!("Failed to save schedules: {e}");
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Execute one command and return the state that results.
    pub fn handle(&mut self, command: Command) -> Result<StateSnapshot, ControlError> {
        debug!(?command, "command received");

        let changed = match command {
            Command::SetChlorine { on } => {
                self.interlock.set_chlorine_on(on);
                false
            }
            Command::SetFilter { on } => {
                if !self.interlock.set_filter_on(on) {
                    info!("filter stays on while chlorine or heater runs");
                }
                false
            }
            Command::SetHeater { on } => {
                self.interlock.set_heater_on(on);
                false
            }
            Command::SetScheduleEnabled { device, enabled } => {
                self.schedules.set_enabled(device, enabled);
                info!(device = %device, enabled, "schedule toggled");
                true
            }
            Command::AddChlorineInterval { start, dose_ml } => {
                self.schedules.chlorine.add(start, DoseMl(dose_ml))
            }
            Command::AddFilterInterval { start, stop } => self.schedules.filter.add(start, stop),
            Command::AddHeaterInterval { start, stop } => self.schedules.heater.add(start, stop),
            Command::RemoveInterval { device, start } => self.schedules.remove(device, start),
            Command::QuickDose { dose_ml } => {
                self.interlock.quick_dose(dose_ml, self.clock.now())?;
                self.reschedule();
                false
            }
            Command::SetTemperatureControl { enabled } => {
                self.interlock.set_temperature_control_enabled(enabled);
                false
            }
            Command::SetGoalTemperature { celsius } => {
                self.schedules.goal_temperature = celsius;
                true
            }
            Command::GetState => false,
        };

        if changed {
            self.save();
            self.reschedule();
        }
        Ok(self.publish())
    }

    // ── Timers and polling ────────────────────────────────────────────────────

    pub fn on_timer(&mut self, event: TimerEvent) {
        let switched = match event {
            TimerEvent::Boundary {
                generation,
                boundary,
            } => self
                .boundaries
                .fire(generation, &boundary, &self.schedules, &mut self.interlock),
            TimerEvent::QuickDoseExpired { id } => {
                self.interlock.finish_quick_dose(id, &self.schedules)
            }
        };
        if switched {
            self.publish();
        }
    }

    /// Handle every timer event that is already queued.
    pub fn drain_timers(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.timer_rx.try_recv() {
            self.on_timer(event);
            handled += 1;
        }
        handled
    }

    /// Re-arm every boundary and re-evaluate the current minute, which also
    /// covers a boundary whose event was superseded by the re-arm.
    pub fn daily_refresh(&mut self) {
        debug!(at = %self.now_minute(), "daily timer refresh");
        self.reschedule();
        self.publish();
    }

    pub fn poll_sensors(&mut self) {
        let readings = self.sensors.poll_temperatures();
        let switched = self
            .interlock
            .on_temperatures(&readings, self.schedules.goal_temperature);
        if switched || readings != self.temperatures {
            self.temperatures = readings;
            self.publish();
        }
    }

    /// Cancel every timer and release every output.
    pub fn shutdown(&mut self) {
        self.boundaries.cancel_all();
        self.interlock.shutdown();
        self.publish();
    }

    // ── Loop ──────────────────────────────────────────────────────────────────

    /// Run until `shutdown` resolves or every [`ControllerHandle`] is dropped.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        self.start();

        let mut daily = tokio::time::interval_at(Instant::now() + DAILY_REFRESH, DAILY_REFRESH);
        let mut poll = tokio::time::interval(self.settings.sensor_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                Some(event) = self.timer_rx.recv() => self.on_timer(event),
                request = self.requests.recv() => match request {
                    Some(Request { command, reply }) => {
                        let result = self.handle(command);
                        if let Err(e) = &result {
                            warn!("command failed: {e}");
                        }
                        let _ = reply.send(result);
                    }
                    None => {
                        info!("all command senders gone");
                        break;
                    }
                },
                _ = daily.tick() => self.daily_refresh(),
                _ = poll.tick() => self.poll_sensors(),
            }
        }

        self.shutdown();
    }
}
