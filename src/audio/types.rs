use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default pipeline sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Capture and render both run mono inside the pipeline
pub const DEFAULT_CHANNELS: u16 = 1;

/// Samples on the bus are always 16-bit signed linear PCM
pub const SAMPLE_WIDTH_BITS: u16 = 16;

pub const BYTES_PER_SAMPLE: usize = 2;

/// 1 MiB staging buffer between producers and the render worker
pub const DEFAULT_BUS_CAPACITY_BYTES: usize = 1024 * 1024;

/// PCM format a worker binds its device to.
///
/// Sample width and signedness are fixed (16-bit signed); only rate and
/// channel count vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub const fn sample_width_bits(&self) -> u16 {
        SAMPLE_WIDTH_BITS
    }

    pub const fn is_signed(&self) -> bool {
        true
    }

    /// Bytes for one sample across all channels
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    pub fn bytes_per_second(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz / {} ch / s{}",
            self.sample_rate, self.channels, SAMPLE_WIDTH_BITS
        )
    }
}

/// Which side of the pipeline a worker or device serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamDirection {
    Capture,
    Render,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamDirection::Capture => f.write_str("capture"),
            StreamDirection::Render => f.write_str("render"),
        }
    }
}

/// Lifecycle of a capture/render worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
}

impl WorkerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Running => 1,
            WorkerState::Stopping => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Idle,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture_format: AudioFormat,
    pub render_format: AudioFormat,
    pub bus_capacity_bytes: usize,
    /// Promote worker threads to real-time scheduling when they start
    pub realtime_priority: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_format: AudioFormat::default(),
            render_format: AudioFormat::default(),
            bus_capacity_bytes: DEFAULT_BUS_CAPACITY_BYTES,
            realtime_priority: true,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        for (label, format) in [
            ("capture_format", &self.capture_format),
            ("render_format", &self.render_format),
        ] {
            if format.sample_rate == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{label}.sample_rate must be greater than zero"
                )));
            }
            if format.channels == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{label}.channels must be greater than zero"
                )));
            }
        }

        if self.bus_capacity_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "bus_capacity_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Errors surfaced by the passthrough pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No default {direction} device available")]
    DeviceUnavailable { direction: StreamDirection },

    #[error("Failed to open {direction} stream: {source}")]
    StreamOpen {
        direction: StreamDirection,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot change {direction} format while the worker is running")]
    FormatLocked { direction: StreamDirection },

    #[error("Gain must be a finite number (got {0})")]
    InvalidGain(f32),

    #[error("Failed to spawn {direction} worker thread: {source}")]
    WorkerSpawn {
        direction: StreamDirection,
        #[source]
        source: std::io::Error,
    },

    #[error("{direction} worker exited before reporting its state")]
    WorkerLost { direction: StreamDirection },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_mono_cd_rate() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.channels, 1);
        assert_eq!(format.sample_width_bits(), 16);
        assert!(format.is_signed());
        assert_eq!(format.bytes_per_frame(), 2);
    }

    #[test]
    fn worker_state_survives_atomic_encoding() {
        for state in [WorkerState::Idle, WorkerState::Running, WorkerState::Stopping] {
            assert_eq!(WorkerState::from_u8(state.as_u8()), state);
        }
        assert_eq!(WorkerState::from_u8(42), WorkerState::Idle);
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = PipelineConfig {
            bus_capacity_bytes: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
