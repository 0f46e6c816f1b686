// src/config.rs
//
// Fixed engine parameters. Built once at startup and handed to everything
// that needs them; nothing here changes while audio is running.

use std::time::Duration;

use crate::error::SetupError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FREQUENCY: f64 = 440.0;
pub const DEFAULT_VOLUME: f64 = 0.6;
pub const DEFAULT_PROCESS_LATENCY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Frames per second for both capture and playback.
    pub sample_rate: u32,

    /// Tone frequency in Hz.
    pub frequency: f64,

    /// Linear tone amplitude.
    pub volume: f64,

    /// Delay between capture and playback.
    pub process_latency: Duration,
}

impl EngineConfig {
    pub fn new(sample_rate: u32, frequency: f64, volume: f64) -> Self {
        Self {
            sample_rate,
            frequency,
            volume,
            process_latency: DEFAULT_PROCESS_LATENCY,
        }
    }

    pub fn with_process_latency(mut self, latency: Duration) -> Self {
        self.process_latency = latency;
        self
    }

    /// Phase advance per sample, in radians.
    #[inline]
    pub fn phase_step(&self) -> f64 {
        std::f64::consts::TAU * self.frequency / self.sample_rate as f64
    }

    /// Process latency expressed in frames at the configured rate.
    pub fn latency_frames(&self) -> usize {
        (self.process_latency.as_secs_f64() * self.sample_rate as f64).round() as usize
    }

    /// Reject parameters the tone generator cannot honor.
    ///
    /// The phase step must stay below one full turn so a single wrap per
    /// sample keeps the accumulator in range.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.sample_rate == 0 {
            return Err(SetupError::InvalidConfig("sample rate must be non-zero"));
        }
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(SetupError::InvalidConfig(
                "frequency must be a positive number",
            ));
        }
        if self.frequency >= self.sample_rate as f64 {
            return Err(SetupError::InvalidConfig(
                "frequency must be below the sample rate",
            ));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(SetupError::InvalidConfig(
                "volume must be a non-negative number",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_FREQUENCY, DEFAULT_VOLUME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.frequency, 440.0);
        assert_eq!(config.volume, 0.6);
        assert_eq!(config.process_latency, Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latency_frames() {
        assert_eq!(EngineConfig::default().latency_frames(), 441);

        let config = EngineConfig::new(48_000, 440.0, 0.5)
            .with_process_latency(Duration::from_millis(5));
        assert_eq!(config.latency_frames(), 240);
    }

    #[test]
    fn test_phase_step() {
        let config = EngineConfig::new(1_000, 250.0, 1.0);
        assert!((config.phase_step() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngineConfig::new(0, 440.0, 0.6).validate().is_err());
        assert!(EngineConfig::new(44_100, 0.0, 0.6).validate().is_err());
        assert!(EngineConfig::new(44_100, f64::NAN, 0.6).validate().is_err());
        assert!(EngineConfig::new(44_100, 44_100.0, 0.6).validate().is_err());
        assert!(EngineConfig::new(44_100, 440.0, -0.1).validate().is_err());
        assert!(EngineConfig::new(44_100, 440.0, f64::INFINITY).validate().is_err());
    }
}
