// src/error.rs
//
// Failures that can happen while bringing the router up. Once audio is
// flowing nothing on the processing path can fail.

use std::io;

use thiserror::Error;

/// Error during startup of one of the router's subsystems.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("config: {0}")]
    InvalidConfig(&'static str),

    #[error("audio: no default {0} device available")]
    NoDevice(&'static str),

    #[error("audio: failed to build {direction} stream: {source}")]
    BuildStream {
        direction: &'static str,
        #[source]
        source: cpal::BuildStreamError,
    },

    #[error("audio: failed to start {direction} stream: {source}")]
    PlayStream {
        direction: &'static str,
        #[source]
        source: cpal::PlayStreamError,
    },

    #[error("audio: failed to query default {direction} config: {source}")]
    DeviceConfig {
        direction: &'static str,
        #[source]
        source: cpal::DefaultStreamConfigError,
    },

    #[error("audio: failed to list supported {direction} configs: {source}")]
    SupportedConfigs {
        direction: &'static str,
        #[source]
        source: cpal::SupportedStreamConfigsError,
    },

    #[error("audio: {direction} device does not support {sample_rate} Hz in f32, i16 or u16")]
    UnsupportedRate {
        direction: &'static str,
        sample_rate: u32,
    },

    #[error("audio: unsupported {direction} sample format {format:?}")]
    UnsupportedFormat {
        direction: &'static str,
        format: cpal::SampleFormat,
    },

    #[error("event listener: {0}")]
    Listener(String),

    #[error("failed to spawn {name} thread: {source}")]
    SpawnThread {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
