/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Remote command channel.
//!
//! A plain TCP listener speaking newline-delimited JSON.  Each line a client
//! sends is one [`Command`]; each gets exactly one reply line:
//!
//! ```text
//! → {"command":"set_filter","on":true}
//! ← {"ok":true,"state":{...}}
//! → {"command":"quick_dose","dose_ml":5}
//! ← {"ok":false,"error":"dose of 5 mL is outside the pump range 16..=23040 mL"}
//! ```
//!
//! Between replies the server pushes `{"event":"state","state":{...}}`
//! whenever the controller publishes a new snapshot, so clients need not
//! poll.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::controller::{Command, ControllerHandle, StateSnapshot};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reply to one command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(state: StateSnapshot) -> Self {
        Self {
            ok: true,
            state: Some(state),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            state: None,
            error: Some(message.into()),
        }
    }
}

/// Unsolicited state push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Push {
    State { state: StateSnapshot },
}

/// Parse one line and run it against the controller.
pub async fn process_line(handle: &ControllerHandle, line: &str) -> Reply {
    let command: Command = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            warn!("Refused command line: {e}");
            return Reply::error(format!("invalid command: {e}"));
        }
    };

    match handle.send(command).await {
        Ok(state) => Reply::ok(state),
        Err(e) => Reply::error(e.to_string()),
    }
}

async fn write_json<W, T>(writer: &mut W, message: &T) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Serve one client until it disconnects.
pub async fn handle_connection(stream: TcpStream, handle: ControllerHandle) -> Result<(), ChannelError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut updates = handle.subscribe();

    // Every client starts from the current state
    let initial = updates.borrow_and_update().clone();
    write_json(&mut writer, &Push::State { state: initial }).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("client disconnected");
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = process_line(&handle, &line).await;
                // The reply already carries this state
                updates.borrow_and_update();
                write_json(&mut writer, &reply).await?;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    debug!("controller gone, closing client");
                    return Ok(());
                }
                let state = updates.borrow_and_update().clone();
                write_json(&mut writer, &Push::State { state }).await?;
            }
        }
    }
}

/// Accept clients forever, one task per connection.
pub async fn serve(listener: TcpListener, handle: ControllerHandle) -> Result<(), ChannelError> {
    info!(addr = %listener.local_addr()?, "command channel listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "client connected");
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, handle).await {
                error!(%peer, "Error handling connection: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerSettings, PoolController};
    use crate::device::{Mode, NoSensors, SimulatedActuator};
    use crate::persist::MemoryStore;
    use crate::time::FakeClock;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Spawn a controller loop and return its handle plus a stop trigger.
    fn spawn_controller() -> (ControllerHandle, oneshot::Sender<()>) {
        let now = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let (controller, handle) = PoolController::new(
            ControllerSettings {
                mode: Mode::Pool,
                temperature_control: false,
                sensor_poll: Duration::from_secs(5),
            },
            Box::new(SimulatedActuator::new()),
            Box::new(NoSensors),
            Box::new(MemoryStore::new()),
            Arc::new(FakeClock::new(now)),
        );
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(controller.run(async {
            let _ = stop_rx.await;
        }));
        (handle, stop_tx)
    }

    // ── process_line ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_line_returns_state() {
        let (handle, _stop) = spawn_controller();
        let reply = process_line(&handle, r#"{"command":"set_filter","on":true}"#).await;
        assert!(reply.ok);
        assert!(reply.state.unwrap().devices.filter_on);
    }

    #[tokio::test]
    async fn unknown_command_is_refused() {
        let (handle, _stop) = spawn_controller();
        let reply = process_line(&handle, r#"{"command":"format_disk"}"#).await;
        assert!(!reply.ok);
        assert!(reply.error.unwrap().starts_with("invalid command"));
    }

    #[tokio::test]
    async fn control_error_is_reported() {
        let (handle, _stop) = spawn_controller();
        let reply = process_line(&handle, r#"{"command":"quick_dose","dose_ml":5}"#).await;
        assert!(!reply.ok);
        assert!(reply.error.unwrap().contains("outside the pump range"));
    }

    #[test]
    fn reply_shapes() {
        let json = serde_json::to_value(Reply::error("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"ok": false, "error": "nope"}));
    }

    // ── TCP ───────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn tcp_round_trip_with_state_push() {
        let (handle, _stop) = spawn_controller();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, handle.clone()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        // Greeting push
        let first = lines.next_line().await.unwrap().unwrap();
        let push: Push = serde_json::from_str(&first).unwrap();
        let Push::State { state } = push;
        assert_eq!(state.mode, Mode::Pool);

        writer
            .write_all(b"{\"command\":\"add_filter_interval\",\"start\":\"09:00\",\"stop\":\"11:00\"}\n")
            .await
            .unwrap();

        // A push may race ahead of the reply; skip pushes until the reply
        let reply = loop {
            let line = lines.next_line().await.unwrap().unwrap();
            if let Ok(reply) = serde_json::from_str::<Reply>(&line) {
                break reply;
            }
        };
        assert!(reply.ok);
        let state = reply.state.unwrap();
        assert!(state.devices.filter_on);
        assert_eq!(state.schedules.filter.len(), 1);

        // A change made by another client is pushed
        handle.send(Command::SetFilter { on: false }).await.unwrap();
        let pushed = loop {
            let line = lines.next_line().await.unwrap().unwrap();
            if let Ok(Push::State { state }) = serde_json::from_str::<Push>(&line) {
                if !state.devices.filter_on {
                    break state;
                }
            }
        };
        assert!(!pushed.devices.filter_on);
    }
}
