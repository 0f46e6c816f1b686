// src/main.rs

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use bleep::{
    AudioSession, ControlFlag, EngineConfig, HotkeyHandler, Readback, ReadbackSnapshot, Shutdown,
    hotkey, lifecycle,
};

/// How often the control thread looks at the audio readback.
const MONITOR_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .ok();

    // --------------------------------
    // Config + shared state
    // --------------------------------

    let config = EngineConfig::default();
    config.validate().context("invalid engine configuration")?;

    let flag = Arc::new(ControlFlag::new());
    let readback = Arc::new(Readback::new());
    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    // --------------------------------
    // Audio
    // --------------------------------

    let session = AudioSession::start(&config, Arc::clone(&flag), Arc::clone(&readback))
        .context("failed to start audio session")?;

    info!(
        "Routing at {} Hz, tone {} Hz @ {}, latency {} frames",
        session.sample_rate(),
        config.frequency,
        config.volume,
        session.latency_frames()
    );

    // --------------------------------
    // Key listener + signals
    // --------------------------------

    hotkey::spawn_listener(HotkeyHandler::new(flag), shutdown_tx.clone())
        .context("failed to start key listener")?;
    lifecycle::install_signal_handler(shutdown_tx)
        .context("failed to install signal handler")?;

    // --------------------------------
    // Run until told to stop
    // --------------------------------

    let mut last = ReadbackSnapshot::default();
    loop {
        match shutdown_rx.recv_timeout(MONITOR_INTERVAL) {
            Ok(Shutdown::Signal) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Shutdown::ListenerFailed(err)) => {
                drop(session);
                return Err(err).context("key listener stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                last = report(last, readback.snapshot());
            }
        }
    }

    drop(session);
    info!("Audio streams stopped, exiting");
    Ok(())
}

/// Log what changed on the audio side since the previous poll.
fn report(previous: ReadbackSnapshot, current: ReadbackSnapshot) -> ReadbackSnapshot {
    if current.tone_active != previous.tone_active {
        info!("Tone {}", if current.tone_active { "on" } else { "off" });
    }
    if current.underrun_frames > previous.underrun_frames {
        warn!(
            "Capture underrun: {} frames played as silence",
            current.underrun_frames - previous.underrun_frames
        );
    }
    if current.overflow_frames > previous.overflow_frames {
        warn!(
            "Capture overflow: {} frames dropped",
            current.overflow_frames - previous.overflow_frames
        );
    }
    current
}
