// src/lib.rs
//
// Library entry point: hotkey-controlled tone router.

mod config;
mod control_flag;
mod error;
mod readback;
mod router;
mod tone;

pub mod audio;
pub mod hotkey;
pub mod lifecycle;

// Re-export key types for the binary and other Rust consumers
pub use audio::AudioSession;
pub use config::{
    DEFAULT_FREQUENCY, DEFAULT_PROCESS_LATENCY, DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME, EngineConfig,
};
pub use control_flag::ControlFlag;
pub use error::SetupError;
pub use hotkey::{HotkeyHandler, KeyTransition, Modifiers, ModifierTracker};
pub use lifecycle::Shutdown;
pub use readback::{Readback, ReadbackSnapshot};
pub use router::{RouterMode, SignalRouter};
pub use tone::ToneGenerator;
