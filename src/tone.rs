// src/tone.rs

use std::f64::consts::TAU;

use crate::config::EngineConfig;

/// Fixed-frequency sine source.
///
/// The phase is kept in double precision so drift stays bounded over long
/// sessions; samples are emitted as `f32` to match the audio path.
///
/// Runs on the audio thread. Never allocates or blocks.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    /// Current angle in `[0, TAU)`
    phase: f64,

    /// Radians advanced per sample
    step: f64,

    volume: f64,
}

impl ToneGenerator {
    /// `config` must pass [`EngineConfig::validate`]; a step of a full turn
    /// or more would outrun the single wrap in `next_sample`.
    pub fn new(config: &EngineConfig) -> Self {
        debug_assert!(config.phase_step() < TAU, "tone frequency at or above sample rate");
        Self {
            phase: 0.0,
            step: config.phase_step(),
            volume: config.volume,
        }
    }

    /// Advance one sample and return it.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.phase += self.step;
        // step < TAU, so one wrap is enough
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        (self.phase.sin() * self.volume) as f32
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
