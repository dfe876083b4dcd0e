//! stayaway - screen-distance deterrent daemon
//!
//! Shows a warning when the configured hot key is pressed or when the camera
//! sees a hand reaching toward the screen. Both sources feed one debounced
//! trigger channel.

mod camera;
mod config;
mod gesture;
mod hotkey;
mod logging;
mod presentation;
mod trigger;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::camera::ReplaySource;
use crate::config::Config;
use crate::gesture::{GestureSession, Thresholds, TrackingSwitch};
use crate::logging::JsonlLogger;
use crate::presentation::WarningPresenter;
use crate::trigger::TriggerArbiter;

/// Application version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    init_tracing(&config.logging.level)?;

    info!("Starting stayaway v{}", VERSION);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    info!(
        "Configuration loaded: cooldown={}ms, gesture={}, hotkey={}",
        config.trigger.cooldown_ms,
        if config.gesture.enabled { "on" } else { "off" },
        if config.hotkey.enabled { config.hotkey.chord.as_str() } else { "off" }
    );

    let journal = Arc::new(Mutex::new(JsonlLogger::new(config.logging.logs_dir())?));
    lock(&journal).log_session_start(VERSION)?;

    let presenter = Arc::new(WarningPresenter::new(config.popup.clone(), Some(journal.clone())));
    let arbiter = Arc::new(TriggerArbiter::new(config.trigger.cooldown(), presenter.clone()));
    let (intake, intake_rx) = TriggerArbiter::intake();

    if config.hotkey.enabled {
        let chord = config.hotkey.parse_chord()?;
        if let Err(e) = hotkey::spawn_listener(chord, intake.clone()) {
            warn!("Could not start hot-key listener: {}", e);
        }
    }

    let switch = TrackingSwitch::new();
    // Held until shutdown so the gesture session keeps waiting for frames.
    let mut idle_publisher = None;

    if config.gesture.enabled {
        let (publisher, frames) = camera::frame_slot();
        let mut session = GestureSession::new(Thresholds::from(&config.gesture), switch.clone());
        session.start();
        lock(&journal).log_tracking_start()?;
        tokio::spawn(session.run(frames, intake.clone()));

        match config.gesture.replay_file.clone() {
            Some(path) => {
                let source = ReplaySource::new(config.gesture.frame_interval());
                tokio::spawn(async move {
                    if let Err(e) = source.play(&path, &publisher).await {
                        error!("Replay failed: {:#}", e);
                    }
                });
            }
            None => {
                info!("No camera adapter in this build; gesture detection waits for frames");
                idle_publisher = Some(publisher);
            }
        }
    }

    // Only producers hold senders from here on.
    drop(intake);

    let arbiter_task = {
        let arbiter = arbiter.clone();
        tokio::spawn(async move { arbiter.run(intake_rx).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down...");

    switch.stop();
    drop(idle_publisher);
    arbiter_task.abort();

    {
        let mut journal = lock(&journal);
        if config.gesture.enabled {
            journal.log_tracking_stop()?;
        }
        journal.log_session_end(arbiter.activations())?;
    }

    info!("Shown {} warnings. Goodbye!", presenter.shown());
    Ok(())
}

fn lock(journal: &Mutex<JsonlLogger>) -> std::sync::MutexGuard<'_, JsonlLogger> {
    journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initialize tracing subscriber with the given log level.
fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
