/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use poolctl::channel;
use poolctl::config::ConfigManager;
use poolctl::controller::PoolController;
use poolctl::device::{self, NoSensors, OneWireSensors, SensorSource};
use poolctl::persist::JsonFileStore;
use poolctl::time::SystemClock;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Pool / hot-tub equipment controller.
///
/// Example:
///   poolctl --config /etc/poolctl.yaml --data-dir /var/lib/poolctl
#[derive(Debug, Parser)]
#[command(
    name = "poolctl",
    about = "Pool / hot-tub controller – schedules, quick dosing and device interlocks",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML controller configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address for the JSON command channel (overrides the config file).
    #[arg(short = 'l', long = "listen")]
    listen: Option<String>,

    /// Directory holding PoolData.json / HotTubData.json (overrides the config file).
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Drive a simulated actuator instead of GPIO.
    #[arg(long = "simulate", default_value_t = false)]
    simulate: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("poolctl starting up...");

    let cli = Cli::parse();

    info!(
        config   = ?cli.config,
        listen   = ?cli.listen,
        data_dir = ?cli.data_dir,
        simulate = cli.simulate,
        "Command line"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config_manager = ConfigManager::new();

    match &cli.config {
        Some(path) => {
            if let Err(e) = config_manager.load_from_file(path) {
                error!("Failed to load configuration: {:#}", e);
                process::exit(1);
            }
        }
        None => {
            warn!("No configuration file provided, using default settings");
        }
    }

    let config = config_manager.config_mut();
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    if let Err(e) = run(&config_manager, cli.simulate).await {
        error!("{:#}", e);
        process::exit(1);
    }

    info!("poolctl stopped");
}

async fn run(config_manager: &ConfigManager, simulate: bool) -> Result<()> {
    let config = config_manager.config();

    // ── Collaborators ─────────────────────────────────────────────────────────
    let actuator = device::open_actuator(&config.gpio_root, &config.device_pins(), simulate);

    let sensors: Box<dyn SensorSource> = if config.w1_root.is_dir() {
        Box::new(OneWireSensors::new(&config.w1_root, &config.sensor_ids()))
    } else {
        warn!(
            "No 1-Wire bus at {}; temperatures will not be reported",
            config.w1_root.display()
        );
        Box::new(NoSensors)
    };

    let store = JsonFileStore::for_mode(&config.data_dir, config.mode());
    info!("Schedule file: {}", store.path().display());

    let (controller, handle) = PoolController::new(
        config.controller_settings(),
        actuator,
        sensors,
        Box::new(store),
        Arc::new(SystemClock),
    );

    // ── Command channel ───────────────────────────────────────────────────────
    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Cannot listen on {}", config.listen))?;
    let server = tokio::spawn(channel::serve(listener, handle));

    // ── Control loop (until Ctrl-C) ───────────────────────────────────────────
    controller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to wait for Ctrl-C: {e}");
            }
        })
        .await;

    server.abort();
    Ok(())
}
