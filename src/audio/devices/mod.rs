// Audio devices module - the hardware boundary of the pipeline
//
// Workers resolve the platform's default input/output device at start time
// through a `DeviceBackend`. No enumeration or explicit device selection is
// exposed.
// - cpal_backend: real hardware through CPAL
// - mock: in-memory devices for tests and headless hosts

pub mod cpal_backend;
pub mod mock;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Sender;

use super::mixer::pipeline::AudioBus;
use super::types::{AudioFormat, StreamDirection};

pub use cpal_backend::CpalBackend;
pub use mock::{MockBackend, MockDeviceSpec, MockStreamEvent};

/// Resolves default devices. Shared by both worker threads.
pub trait DeviceBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn default_input_device(&self) -> Option<Box<dyn AudioDevice>>;

    fn default_output_device(&self) -> Option<Box<dyn AudioDevice>>;

    fn default_device(&self, direction: StreamDirection) -> Option<Box<dyn AudioDevice>> {
        match direction {
            StreamDirection::Capture => self.default_input_device(),
            StreamDirection::Render => self.default_output_device(),
        }
    }
}

/// A resolved device, used only on the worker thread that resolved it.
pub trait AudioDevice {
    fn name(&self) -> String;

    fn direction(&self) -> StreamDirection;

    fn supports_format(&self, format: &AudioFormat) -> bool;

    /// The format the device would pick on its own
    fn preferred_format(&self) -> AudioFormat;

    /// Start streaming between the device and `bus`.
    ///
    /// Capture devices write raw PCM into the bus; render devices drain it.
    /// Asynchronous device errors are reported on `errors`.
    fn open_stream(
        &self,
        format: AudioFormat,
        bus: Arc<AudioBus>,
        errors: Sender<String>,
    ) -> Result<Box<dyn ActiveStream>>;
}

/// A running device stream. Dropping it releases the device.
pub trait ActiveStream {
    fn pause(&mut self) -> Result<()>;
}
