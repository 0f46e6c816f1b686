// src/readback.rs
//
// Lock-free audio -> control thread readback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::router::RouterMode;

/// Counters published by the capture and playback callbacks.
///
/// Uses atomics only; the audio thread never waits on the reader.
#[derive(Debug, Default)]
pub struct Readback {
    blocks_processed: AtomicU64,
    /// Frames the playback side needed but capture had not delivered yet
    underrun_frames: AtomicU64,
    /// Captured frames dropped because the ring was full
    overflow_frames: AtomicU64,
    tone_active: AtomicBool,
}

/// Plain copy of the readback values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadbackSnapshot {
    pub blocks_processed: u64,
    pub underrun_frames: u64,
    pub overflow_frames: u64,
    pub tone_active: bool,
}

impl Readback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed block.
    ///
    /// Audio-thread only.
    #[inline]
    pub fn record_block(&self, mode: RouterMode, underrun_frames: usize) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
        if underrun_frames > 0 {
            self.underrun_frames
                .fetch_add(underrun_frames as u64, Ordering::Relaxed);
        }
        self.tone_active
            .store(mode == RouterMode::Tone, Ordering::Relaxed);
    }

    /// Capture-thread only.
    #[inline]
    pub fn record_overflow(&self, frames: usize) {
        self.overflow_frames
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReadbackSnapshot {
        ReadbackSnapshot {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
            overflow_frames: self.overflow_frames.load(Ordering::Relaxed),
            tone_active: self.tone_active.load(Ordering::Relaxed),
        }
    }
}
