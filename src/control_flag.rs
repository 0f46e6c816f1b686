// src/control_flag.rs

use std::sync::atomic::{AtomicBool, Ordering};

/// Level-triggered "tone active" state shared between the key listener
/// and the audio callback.
///
/// Single writer (listener thread)
/// Single reader (audio thread)
///
/// There is no queue: transitions faster than the audio block rate
/// collapse into the most recent value.
#[derive(Debug, Default)]
pub struct ControlFlag {
    tone_active: AtomicBool,
}

impl ControlFlag {
    pub fn new() -> Self {
        Self {
            tone_active: AtomicBool::new(false),
        }
    }

    /// Publish a new state.
    ///
    /// Listener-side. Never blocks.
    #[inline]
    pub fn set(&self, active: bool) {
        self.tone_active.store(active, Ordering::Release);
    }

    /// Read the most recently published state.
    ///
    /// Audio-thread-safe, lock-free.
    #[inline]
    pub fn get(&self) -> bool {
        self.tone_active.load(Ordering::Acquire)
    }
}
