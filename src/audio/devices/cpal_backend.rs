// CPAL device backend
//
// The bus always carries 16-bit signed PCM. Devices that only speak f32 get
// their samples converted inside the callback.

use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam::channel::Sender;
use tracing::{error, info, warn};

use super::{ActiveStream, AudioDevice, DeviceBackend};
use crate::audio::mixer::pipeline::AudioBus;
use crate::audio::types::{AudioFormat, StreamDirection, BYTES_PER_SAMPLE};
use crate::audio::utils::{extend_with_samples, f32_to_i16, i16_to_f32};

/// Default devices of the platform's default CPAL host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for CpalBackend {
    fn backend_name(&self) -> &'static str {
        "cpal"
    }

    fn default_input_device(&self) -> Option<Box<dyn AudioDevice>> {
        let host = cpal::default_host();
        host.default_input_device().map(|device| {
            Box::new(CpalDevice::new(device, StreamDirection::Capture)) as Box<dyn AudioDevice>
        })
    }

    fn default_output_device(&self) -> Option<Box<dyn AudioDevice>> {
        let host = cpal::default_host();
        host.default_output_device().map(|device| {
            Box::new(CpalDevice::new(device, StreamDirection::Render)) as Box<dyn AudioDevice>
        })
    }
}

struct CpalDevice {
    device: cpal::Device,
    direction: StreamDirection,
}

impl CpalDevice {
    fn new(device: cpal::Device, direction: StreamDirection) -> Self {
        Self { device, direction }
    }

    fn supported_ranges(&self) -> Vec<SupportedStreamConfigRange> {
        let ranges = match self.direction {
            StreamDirection::Capture => self
                .device
                .supported_input_configs()
                .map(|configs| configs.collect::<Vec<_>>()),
            StreamDirection::Render => self
                .device
                .supported_output_configs()
                .map(|configs| configs.collect::<Vec<_>>()),
        };

        match ranges {
            Ok(ranges) => ranges,
            Err(e) => {
                warn!(
                    "⚠️ CPAL_BACKEND: Failed to query {} configs for '{}': {}",
                    self.direction,
                    self.name(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Sample format to open the stream with; prefers native i16
    fn stream_sample_format(&self, format: &AudioFormat) -> SampleFormat {
        let matching: Vec<SampleFormat> = self
            .supported_ranges()
            .iter()
            .filter(|range| range_covers(range, format))
            .map(|range| range.sample_format())
            .collect();

        if matching.contains(&SampleFormat::I16) {
            SampleFormat::I16
        } else if matching.contains(&SampleFormat::F32) {
            SampleFormat::F32
        } else {
            self.default_config()
                .map(|config| config.sample_format())
                .unwrap_or(SampleFormat::I16)
        }
    }

    fn default_config(&self) -> Option<cpal::SupportedStreamConfig> {
        let config = match self.direction {
            StreamDirection::Capture => self.device.default_input_config(),
            StreamDirection::Render => self.device.default_output_config(),
        };

        match config {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(
                    "⚠️ CPAL_BACKEND: No default {} config for '{}': {}",
                    self.direction,
                    self.name(),
                    e
                );
                None
            }
        }
    }

    fn build_capture(
        &self,
        config: &cpal::StreamConfig,
        sample_format: SampleFormat,
        bus: Arc<AudioBus>,
        errors: Sender<String>,
    ) -> Result<cpal::Stream> {
        let device_name = self.name();
        let error_callback = stream_error_callback(device_name, errors);

        let stream = match sample_format {
            SampleFormat::I16 => {
                let mut scratch: Vec<u8> = Vec::new();
                self.device.build_input_stream(
                    config,
                    move |data: &[i16], _info: &cpal::InputCallbackInfo| {
                        // Raw bytes, no input gain on the live capture path
                        scratch.clear();
                        extend_with_samples(&mut scratch, data.iter().copied());
                        bus.write(&scratch);
                    },
                    error_callback,
                    None,
                )?
            }
            SampleFormat::F32 => {
                let mut scratch: Vec<u8> = Vec::new();
                self.device.build_input_stream(
                    config,
                    move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        extend_with_samples(&mut scratch, data.iter().map(|&s| f32_to_i16(s)));
                        bus.write(&scratch);
                    },
                    error_callback,
                    None,
                )?
            }
            other => {
                return Err(anyhow::anyhow!("Unsupported sample format: {:?}", other));
            }
        };

        Ok(stream)
    }

    fn build_render(
        &self,
        config: &cpal::StreamConfig,
        sample_format: SampleFormat,
        bus: Arc<AudioBus>,
        errors: Sender<String>,
    ) -> Result<cpal::Stream> {
        let device_name = self.name();
        let error_callback = stream_error_callback(device_name, errors);

        let stream = match sample_format {
            SampleFormat::I16 => {
                let mut scratch: Vec<u8> = Vec::new();
                self.device.build_output_stream(
                    config,
                    move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                        pull_from_bus(&bus, &mut scratch, data.len());
                        for (slot, pair) in data.iter_mut().zip(scratch.chunks_exact(BYTES_PER_SAMPLE)) {
                            *slot = i16::from_le_bytes([pair[0], pair[1]]);
                        }
                    },
                    error_callback,
                    None,
                )?
            }
            SampleFormat::F32 => {
                let mut scratch: Vec<u8> = Vec::new();
                self.device.build_output_stream(
                    config,
                    move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                        pull_from_bus(&bus, &mut scratch, data.len());
                        for (slot, pair) in data.iter_mut().zip(scratch.chunks_exact(BYTES_PER_SAMPLE)) {
                            *slot = i16_to_f32(i16::from_le_bytes([pair[0], pair[1]]));
                        }
                    },
                    error_callback,
                    None,
                )?
            }
            other => {
                return Err(anyhow::anyhow!("Unsupported sample format: {:?}", other));
            }
        };

        Ok(stream)
    }
}

impl AudioDevice for CpalDevice {
    fn name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    fn direction(&self) -> StreamDirection {
        self.direction
    }

    fn supports_format(&self, format: &AudioFormat) -> bool {
        self.supported_ranges()
            .iter()
            .any(|range| range_covers(range, format))
    }

    fn preferred_format(&self) -> AudioFormat {
        self.default_config()
            .map(|config| AudioFormat::new(config.sample_rate().0, config.channels()))
            .unwrap_or_default()
    }

    fn open_stream(
        &self,
        format: AudioFormat,
        bus: Arc<AudioBus>,
        errors: Sender<String>,
    ) -> Result<Box<dyn ActiveStream>> {
        let sample_format = self.stream_sample_format(&format);
        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        info!(
            "🎛️ CPAL_BACKEND: Opening {} stream on '{}' ({}, device format {:?})",
            self.direction,
            self.name(),
            format,
            sample_format
        );

        let stream = match self.direction {
            StreamDirection::Capture => self.build_capture(&config, sample_format, bus, errors),
            StreamDirection::Render => self.build_render(&config, sample_format, bus, errors),
        }
        .with_context(|| format!("Failed to build {} stream on '{}'", self.direction, self.name()))?;

        stream
            .play()
            .with_context(|| format!("Failed to start {} stream on '{}'", self.direction, self.name()))?;

        Ok(Box::new(CpalStream { stream }))
    }
}

struct CpalStream {
    stream: cpal::Stream,
}

impl ActiveStream for CpalStream {
    fn pause(&mut self) -> Result<()> {
        self.stream.pause().context("Failed to pause stream")
    }
}

fn range_covers(range: &SupportedStreamConfigRange, format: &AudioFormat) -> bool {
    range.channels() == format.channels
        && range.min_sample_rate().0 <= format.sample_rate
        && format.sample_rate <= range.max_sample_rate().0
        && matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32)
}

/// Fill `scratch` with `samples` worth of bus bytes, padding an underrun with silence
fn pull_from_bus(bus: &AudioBus, scratch: &mut Vec<u8>, samples: usize) {
    scratch.clear();
    scratch.resize(samples * BYTES_PER_SAMPLE, 0);
    let filled = bus.read_into(scratch);
    if filled < scratch.len() {
        scratch[filled..].fill(0);
        crate::audio_debug!(
            "🔇 CPAL_BACKEND: Render underrun, padded {} bytes of silence",
            scratch.len() - filled
        );
    }
}

fn stream_error_callback(
    device_name: String,
    errors: Sender<String>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        error!("❌ Stream error for device '{}': {}", device_name, err);
        let _ = errors.try_send(err.to_string());
    }
}
