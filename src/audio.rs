//! Duplex audio session.
//!
//! Capture and playback run as two cpal streams joined by a lock-free ring
//! buffer:
//!
//! - **Capture callback** owns a [`CaptureWriter`] and pushes the first
//!   channel of every captured frame into the ring
//! - **Playback callback** owns a [`PlaybackRenderer`], pops the same
//!   number of frames, routes them through the [`SignalRouter`] and writes
//!   the mono result to every output channel
//!
//! Devices are opened at the configured rate in whichever of f32, i16 or
//! u16 they support; conversion to and from the router's f32 happens in
//! the callbacks.
//!
//! The ring starts with [`EngineConfig::latency_frames`] frames of silence.
//! That pre-roll is the fixed processing latency the router adds, declared
//! once when the session starts.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, SupportedStreamConfigRange};
use log::{debug, error, info, warn};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::config::EngineConfig;
use crate::control_flag::ControlFlag;
use crate::error::SetupError;
use crate::readback::Readback;
use crate::router::SignalRouter;
use crate::tone::ToneGenerator;

/// Largest block handed to the router in one call. Bigger device callbacks
/// are split so the scratch buffers never grow on the audio thread.
pub const MAX_BLOCK_FRAMES: usize = 4096;

/// Capture side: device frames -> mono ring.
pub struct CaptureWriter {
    producer: HeapProd<f32>,
    channels: usize,
    readback: Arc<Readback>,
}

impl CaptureWriter {
    pub fn new(producer: HeapProd<f32>, channels: usize, readback: Arc<Readback>) -> Self {
        Self {
            producer,
            channels: channels.max(1),
            readback,
        }
    }

    /// Push the first channel of each interleaved frame.
    ///
    /// Audio-thread-safe. Frames that do not fit are dropped and counted.
    pub fn capture<T>(&mut self, data: &[T])
    where
        T: Sample,
        f32: FromSample<T>,
    {
        let mut dropped = 0;
        for frame in data.chunks(self.channels) {
            if self.producer.try_push(f32::from_sample(frame[0])).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            self.readback.record_overflow(dropped);
        }
    }
}

/// Playback side: mono ring -> router -> every device channel.
pub struct PlaybackRenderer {
    router: SignalRouter,
    consumer: HeapCons<f32>,
    channels: usize,
    readback: Arc<Readback>,

    /// Pre-allocated input and output blocks (reused each callback)
    input_scratch: Vec<f32>,
    output_scratch: Vec<f32>,
}

impl PlaybackRenderer {
    pub fn new(
        router: SignalRouter,
        consumer: HeapCons<f32>,
        channels: usize,
        readback: Arc<Readback>,
    ) -> Self {
        Self {
            router,
            consumer,
            channels: channels.max(1),
            readback,
            input_scratch: vec![0.0; MAX_BLOCK_FRAMES],
            output_scratch: vec![0.0; MAX_BLOCK_FRAMES],
        }
    }

    /// Fill one interleaved device buffer.
    ///
    /// Must not allocate or block. Missing captured frames play as silence
    /// in passthrough mode and are counted as underruns.
    pub fn render<T>(&mut self, data: &mut [T])
    where
        T: Sample + FromSample<f32>,
    {
        for chunk in data.chunks_mut(MAX_BLOCK_FRAMES * self.channels) {
            let frames = chunk.len() / self.channels;
            if frames == 0 {
                chunk.fill(T::EQUILIBRIUM);
                continue;
            }

            let input = &mut self.input_scratch[..frames];
            let popped = self.consumer.pop_slice(input);
            input[popped..].fill(0.0);

            let output = &mut self.output_scratch[..frames];
            self.router.process_block(input, output);

            for (frame, &sample) in chunk.chunks_mut(self.channels).zip(output.iter()) {
                frame.fill(T::from_sample(sample));
            }

            self.readback.record_block(self.router.mode(), frames - popped);
        }
    }

    pub fn router(&self) -> &SignalRouter {
        &self.router
    }
}

/// Running capture + playback streams. Dropping the session stops both.
pub struct AudioSession {
    _input: cpal::Stream,
    _output: cpal::Stream,
    sample_rate: u32,
    latency_frames: usize,
}

impl AudioSession {
    /// Open the default input and output devices and start routing.
    pub fn start(
        config: &EngineConfig,
        flag: Arc<ControlFlag>,
        readback: Arc<Readback>,
    ) -> Result<Self, SetupError> {
        config.validate()?;

        let host = cpal::default_host();

        let input_device = host
            .default_input_device()
            .ok_or(SetupError::NoDevice("input"))?;
        let output_device = host
            .default_output_device()
            .ok_or(SetupError::NoDevice("output"))?;

        let default_input_channels = input_device
            .default_input_config()
            .map_err(|source| SetupError::DeviceConfig {
                direction: "input",
                source,
            })?
            .channels();
        let default_output_channels = output_device
            .default_output_config()
            .map_err(|source| SetupError::DeviceConfig {
                direction: "output",
                source,
            })?
            .channels();

        let input_ranges: Vec<_> = input_device
            .supported_input_configs()
            .map_err(|source| SetupError::SupportedConfigs {
                direction: "input",
                source,
            })?
            .collect();
        let output_ranges: Vec<_> = output_device
            .supported_output_configs()
            .map_err(|source| SetupError::SupportedConfigs {
                direction: "output",
                source,
            })?
            .collect();

        let (input_channels, input_format) =
            choose_stream_format(&input_ranges, default_input_channels, config.sample_rate)
                .ok_or(SetupError::UnsupportedRate {
                    direction: "input",
                    sample_rate: config.sample_rate,
                })?;
        let (output_channels, output_format) =
            choose_stream_format(&output_ranges, default_output_channels, config.sample_rate)
                .ok_or(SetupError::UnsupportedRate {
                    direction: "output",
                    sample_rate: config.sample_rate,
                })?;

        info!(
            "Audio devices: input '{}' ({} ch, {:?}), output '{}' ({} ch, {:?}) at {} Hz",
            input_device.name().unwrap_or_else(|_| "unknown".into()),
            input_channels,
            input_format,
            output_device.name().unwrap_or_else(|_| "unknown".into()),
            output_channels,
            output_format,
            config.sample_rate,
        );

        let latency_frames = config.latency_frames();
        let (producer, consumer) = latency_ring(latency_frames);

        let capture =
            CaptureWriter::new(producer, input_channels as usize, Arc::clone(&readback));
        let router = SignalRouter::new(flag, ToneGenerator::new(config));
        let playback =
            PlaybackRenderer::new(router, consumer, output_channels as usize, readback);

        let input_config = stream_config(config, input_channels);
        let input = match input_format {
            SampleFormat::F32 => build_input::<f32>(&input_device, &input_config, capture),
            SampleFormat::I16 => build_input::<i16>(&input_device, &input_config, capture),
            SampleFormat::U16 => build_input::<u16>(&input_device, &input_config, capture),
            other => Err(SetupError::UnsupportedFormat {
                direction: "input",
                format: other,
            }),
        }?;

        let output_config = stream_config(config, output_channels);
        let output = match output_format {
            SampleFormat::F32 => build_output::<f32>(&output_device, &output_config, playback),
            SampleFormat::I16 => build_output::<i16>(&output_device, &output_config, playback),
            SampleFormat::U16 => build_output::<u16>(&output_device, &output_config, playback),
            other => Err(SetupError::UnsupportedFormat {
                direction: "output",
                format: other,
            }),
        }?;

        input.play().map_err(|source| SetupError::PlayStream {
            direction: "input",
            source,
        })?;
        output.play().map_err(|source| SetupError::PlayStream {
            direction: "output",
            source,
        })?;

        debug!(
            "Audio streams started, process latency {} frames ({:?})",
            latency_frames, config.process_latency
        );

        Ok(Self {
            _input: input,
            _output: output,
            sample_rate: config.sample_rate,
            latency_frames,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn latency_frames(&self) -> usize {
        self.latency_frames
    }
}

/// Pick channel count and sample format for a device at `sample_rate`.
///
/// Only ranges covering the rate in f32, i16 or u16 qualify. f32 wins
/// over i16 over u16; within a format the device's default channel count
/// is preferred.
pub fn choose_stream_format(
    ranges: &[SupportedStreamConfigRange],
    default_channels: u16,
    sample_rate: u32,
) -> Option<(u16, SampleFormat)> {
    ranges
        .iter()
        .filter(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .filter_map(|range| {
            let rank = match range.sample_format() {
                SampleFormat::F32 => 0,
                SampleFormat::I16 => 1,
                SampleFormat::U16 => 2,
                _ => return None,
            };
            let channel_mismatch = range.channels() != default_channels;
            Some(((rank, channel_mismatch), range.channels(), range.sample_format()))
        })
        .min_by_key(|(key, _, _)| *key)
        .map(|(_, channels, format)| (channels, format))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut capture: CaptureWriter,
) -> Result<cpal::Stream, SetupError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| capture.capture(data),
            |err| error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|source| SetupError::BuildStream {
            direction: "input",
            source,
        })
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut playback: PlaybackRenderer,
) -> Result<cpal::Stream, SetupError>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| playback.render(data),
            |err| error!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|source| SetupError::BuildStream {
            direction: "output",
            source,
        })
}

fn stream_config(config: &EngineConfig, channels: u16) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Mono ring pre-filled with `latency_frames` of silence.
///
/// Capacity leaves room for the pre-roll plus one full router block of
/// capture jitter.
pub fn latency_ring(latency_frames: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    let ring = HeapRb::<f32>::new(latency_frames * 2 + MAX_BLOCK_FRAMES);
    let (mut producer, consumer) = ring.split();

    let filled = producer.push_iter(std::iter::repeat_n(0.0, latency_frames));
    if filled < latency_frames {
        warn!("Latency pre-roll truncated to {} frames", filled);
    }

    (producer, consumer)
}
