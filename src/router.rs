// src/router.rs

use std::sync::Arc;

use crate::control_flag::ControlFlag;
use crate::tone::ToneGenerator;

/// What the router emitted for the most recent block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RouterMode {
    /// Output is a copy of the input
    #[default]
    Passthrough,

    /// Output is the generated tone, input is ignored
    Tone,
}

/// Per-block switch between the input signal and the tone.
///
/// This struct runs exclusively on the audio thread.
/// It must be allocation-free and lock-free.
///
/// The control flag is sampled once at the start of each block, so a
/// block is always entirely one mode. Mode follows the flag level, not
/// its edges.
pub struct SignalRouter {
    flag: Arc<ControlFlag>,
    tone: ToneGenerator,
    mode: RouterMode,
}

impl SignalRouter {
    pub fn new(flag: Arc<ControlFlag>, tone: ToneGenerator) -> Self {
        Self {
            flag,
            tone,
            mode: RouterMode::Passthrough,
        }
    }

    /// Fill `output` from either `input` or the tone generator.
    ///
    /// Called once per audio block. Empty buffers mean the engine had
    /// nothing for this tick: no work, no state change. If the lengths
    /// disagree only the common prefix is written.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        if input.is_empty() || output.is_empty() {
            return;
        }

        let frames = input.len().min(output.len());
        let output = &mut output[..frames];

        self.mode = if self.flag.get() {
            RouterMode::Tone
        } else {
            RouterMode::Passthrough
        };

        match self.mode {
            RouterMode::Tone => {
                // Phase only moves here, which keeps it continuous across
                // passthrough stretches.
                for sample in output.iter_mut() {
                    *sample = self.tone.next_sample();
                }
            }
            RouterMode::Passthrough => {
                output.copy_from_slice(&input[..frames]);
            }
        }
    }

    #[inline]
    pub fn mode(&self) -> RouterMode {
        self.mode
    }

    pub fn tone(&self) -> &ToneGenerator {
        &self.tone
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;
    use crate::config::EngineConfig;

    const BLOCK: usize = 64;

    fn router(config: &EngineConfig) -> (Arc<ControlFlag>, SignalRouter) {
        let flag = Arc::new(ControlFlag::new());
        let router = SignalRouter::new(Arc::clone(&flag), ToneGenerator::new(config));
        (flag, router)
    }

    /// Distinct, out-of-tone-range input so blocks are easy to classify.
    fn ramp(block: usize) -> Vec<f32> {
        (0..BLOCK)
            .map(|i| 2.0 + (block * BLOCK + i) as f32 * 0.001)
            .collect()
    }

    fn phase_distance(a: f64, b: f64) -> f64 {
        let d = (b - a).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn test_passthrough_identity() {
        let (_flag, mut router) = router(&EngineConfig::default());

        for block in 0..10 {
            let input = ramp(block);
            let mut output = vec![0.0; BLOCK];
            router.process_block(&input, &mut output);
            assert_eq!(output, input);
        }

        assert_eq!(router.mode(), RouterMode::Passthrough);
        assert_eq!(router.tone().phase(), 0.0);
    }

    #[test]
    fn test_tone_ignores_input() {
        let config = EngineConfig::default();
        let (flag, mut router) = router(&config);
        let mut reference = ToneGenerator::new(&config);
        flag.set(true);

        for block in 0..4 {
            let mut output = vec![0.0; BLOCK];
            router.process_block(&ramp(block), &mut output);
            assert_eq!(router.mode(), RouterMode::Tone);

            for sample in output {
                assert_eq!(sample, reference.next_sample());
            }
        }
    }

    #[test]
    fn test_tone_continuity_across_blocks() {
        let config = EngineConfig::default();
        let (flag, mut router) = router(&config);
        let step = config.phase_step();
        flag.set(true);

        let mut expected_phase = 0.0_f64;
        for block in 0..20 {
            let mut output = vec![0.0; BLOCK];
            router.process_block(&ramp(block), &mut output);

            for sample in output {
                expected_phase = (expected_phase + step).rem_euclid(TAU);
                let expected = (expected_phase.sin() * config.volume) as f32;
                assert!((sample - expected).abs() < 1e-6);
            }
            assert!(phase_distance(router.tone().phase(), expected_phase) < 1e-9);
        }
    }

    #[test]
    fn test_phase_frozen_during_passthrough() {
        let config = EngineConfig::default();
        let (flag, mut router) = router(&config);
        let mut output = vec![0.0; BLOCK];

        flag.set(true);
        router.process_block(&ramp(0), &mut output);
        let phase_before = router.tone().phase();
        let last_tone = output[BLOCK - 1];

        // k = 3 blocks of passthrough
        flag.set(false);
        for block in 1..4 {
            router.process_block(&ramp(block), &mut output);
        }
        assert_eq!(router.tone().phase(), phase_before);

        flag.set(true);
        router.process_block(&ramp(4), &mut output);

        // Resumes exactly one step past where it stopped.
        let mut reference = ToneGenerator::new(&config);
        for _ in 0..BLOCK {
            reference.next_sample();
        }
        assert_eq!(reference.next_sample(), output[0]);
        assert!(phase_distance(phase_before, router.tone().phase()) > 0.0);
        let jump = (output[0] - last_tone).abs() as f64;
        assert!(jump <= config.phase_step() * config.volume + 1e-6);
    }

    #[test]
    fn test_empty_block_is_noop() {
        let (flag, mut router) = router(&EngineConfig::default());
        flag.set(true);

        let mut output: [f32; 0] = [];
        router.process_block(&[], &mut output);
        assert_eq!(router.tone().phase(), 0.0);
        assert_eq!(router.mode(), RouterMode::Passthrough);

        let mut output = vec![7.0; BLOCK];
        router.process_block(&[], &mut output);
        assert!(output.iter().all(|&s| s == 7.0));
        assert_eq!(router.tone().phase(), 0.0);

        router.process_block(&ramp(0), &mut []);
        assert_eq!(router.tone().phase(), 0.0);
        assert_eq!(router.mode(), RouterMode::Passthrough);
    }

    #[test]
    fn test_mismatched_lengths_use_common_prefix() {
        let (_flag, mut router) = router(&EngineConfig::default());
        let input = [1.0, 2.0, 3.0];
        let mut output = [0.0; 5];

        router.process_block(&input, &mut output);
        assert_eq!(output, [1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_off_on_off_blocks() {
        let config = EngineConfig::default();
        let (flag, mut router) = router(&config);
        let step = config.phase_step();
        let max_jump = (step * config.volume) as f32 + 1e-6;

        let mut previous_tail: Option<f32> = None;
        for block in 1..=15 {
            flag.set((6..=10).contains(&block));

            let input = ramp(block);
            let mut output = vec![0.0; BLOCK];
            router.process_block(&input, &mut output);

            if (6..=10).contains(&block) {
                assert_eq!(router.mode(), RouterMode::Tone);
                if let Some(tail) = previous_tail {
                    assert!((output[0] - tail).abs() <= max_jump);
                }
                for pair in output.windows(2) {
                    assert!((pair[1] - pair[0]).abs() <= max_jump);
                }
                previous_tail = Some(output[BLOCK - 1]);
            } else {
                assert_eq!(router.mode(), RouterMode::Passthrough);
                assert_eq!(output, input);
            }
        }

        assert!(phase_distance(router.tone().phase(), (5 * BLOCK) as f64 * step) < 1e-9);
    }

    #[test]
    fn test_rapid_toggling_never_splits_a_block() {
        let config = EngineConfig::default();
        let (flag, mut router) = router(&config);
        let done = Arc::new(AtomicBool::new(false));

        let toggler = {
            let flag = Arc::clone(&flag);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut state = false;
                while !done.load(Ordering::Relaxed) {
                    state = !state;
                    flag.set(state);
                }
            })
        };

        let mut expected_phase = 0.0_f64;
        for block in 0..2_000 {
            let input = ramp(block % 16);
            let mut output = vec![0.0; BLOCK];
            router.process_block(&input, &mut output);

            match router.mode() {
                RouterMode::Passthrough => assert_eq!(output, input),
                RouterMode::Tone => {
                    // Every sample is tone; input values are all >= 2.0.
                    assert!(output.iter().all(|s| s.abs() <= config.volume as f32));
                    expected_phase =
                        (expected_phase + BLOCK as f64 * config.phase_step()).rem_euclid(TAU);
                }
            }
        }

        done.store(true, Ordering::Relaxed);
        toggler.join().unwrap();

        // Phase advanced by exactly the tone blocks observed.
        assert!(phase_distance(router.tone().phase(), expected_phase) < 1e-6);
    }
}
