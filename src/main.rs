//! # Drive Shaper
//!
//! Drive a mobile robot from a gamepad.
//!
//! Reads the gamepad via evdev, shapes the stick input into a chassis
//! velocity command every control cycle, and hands it to the drivetrain.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load and validate the TOML configuration
//!    - Set up logging (stdout plus a daily rolling file when telemetry is on)
//!    - Start the gamepad reader thread
//!
//! 2. **Main Loop**
//!    - Every `cycle_period_ms`, sample the latest gamepad state
//!    - Run the drive pipeline and send one command to the drivetrain
//!    - Log status once per second
//!
//! 3. **Graceful Shutdown**
//!    - On Ctrl+C, command zero velocity and exit
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use drive_shaper::config::Config;
use drive_shaper::drivetrain::{Drivetrain, LoggingDrivetrain};
use drive_shaper::gamepad::{EventMapper, Gamepad, GamepadState, InputBindings};
use drive_shaper::pipeline::DriveCommandPipeline;
use drive_shaper::telemetry::JsonlSink;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Delay between gamepad reconnect attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Status log period
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config);

    info!("Drive Shaper v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let bindings = InputBindings::from_config(&config.input)?;
    let (state_tx, mut state_rx) = watch::channel(GamepadState::default());
    spawn_gamepad_reader(config.input.device_path.clone(), bindings, state_tx)?;

    let shaping = config.shaping();
    let mut pipeline = DriveCommandPipeline::new(&shaping);
    if config.telemetry.enabled {
        let sink = JsonlSink::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
            config.telemetry.log_interval(),
        )?;
        pipeline = pipeline.with_telemetry(Box::new(sink));
    }

    let period = config.drive.cycle_period();
    let cycles_per_status = (STATUS_INTERVAL.as_millis() / period.as_millis()).max(1) as u64;
    let mut drivetrain = LoggingDrivetrain::new(cycles_per_status);

    let mut cycle_interval = interval(period);
    cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Starting drive loop at {}ms ({:.0}Hz)",
        period.as_millis(),
        1.0 / shaping.dt()
    );
    info!("Press Ctrl+C to exit");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut cycle_count: u64 = 0;

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                let input = state_rx.borrow_and_update().drive_input();
                let command = pipeline.run_cycle(&input, shaping.dt(), &mut drivetrain);
                cycle_count += 1;

                if cycle_count % cycles_per_status == 0 {
                    debug!(
                        "Cycle {}: vx={:.3} vy={:.3} omega={:.3} boost={}",
                        cycle_count, command.vx, command.vy, command.omega, input.boost
                    );
                    if pipeline.telemetry_failures() > 0 {
                        debug!("Telemetry failures so far: {}", pipeline.telemetry_failures());
                    }
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                drivetrain.drive(0.0, 0.0, 0.0);
                info!("Total cycles run: {}", cycle_count);
                break;
            }
        }
    }

    Ok(())
}

/// Sets up stdout logging and, when telemetry is enabled, a daily rolling log file.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let stdout_layer = tracing_subscriber::fmt::layer();

    if config.telemetry.enabled {
        let appender =
            tracing_appender::rolling::daily(&config.telemetry.log_dir, "drive-shaper.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .init();
        None
    }
}

/// Starts the thread that reads the gamepad and publishes its state.
///
/// evdev reads block, so this runs on a plain thread rather than the async
/// runtime. A disconnect publishes a centered state before reconnecting.
fn spawn_gamepad_reader(
    device_path: String,
    bindings: InputBindings,
    state_tx: watch::Sender<GamepadState>,
) -> Result<()> {
    thread::Builder::new()
        .name("gamepad".to_string())
        .spawn(move || {
            let mut mapper = EventMapper::new(bindings);

            while !state_tx.is_closed() {
                let mut gamepad = match Gamepad::open(&device_path, &bindings) {
                    Ok(gamepad) => gamepad,
                    Err(e) => {
                        warn!("Gamepad unavailable: {}", e);
                        thread::sleep(RECONNECT_DELAY);
                        continue;
                    }
                };
                info!(
                    "Gamepad connected: {} ({})",
                    gamepad.device_path(),
                    gamepad.name().unwrap_or("unnamed")
                );
                mapper.set_ranges(gamepad.axis_ranges(&bindings));

                loop {
                    let mut changed = false;
                    match gamepad.fetch_events() {
                        Ok(events) => {
                            for event in events {
                                changed |= mapper.process_event(&event);
                            }
                        }
                        Err(e) => {
                            warn!("Gamepad disconnected: {}", e);
                            break;
                        }
                    }
                    if changed && state_tx.send(*mapper.state()).is_err() {
                        return;
                    }
                }

                mapper.reset();
                if state_tx.send(*mapper.state()).is_err() {
                    return;
                }
                thread::sleep(RECONNECT_DELAY);
            }
        })
        .context("failed to start gamepad reader thread")?;

    Ok(())
}
