// Render worker: AudioBus → speakers
//
// Owns a dedicated thread bound to the default output device. The device
// callback drains the bus; an underrun is padded with silence.

use std::sync::Arc;

use super::audio_bus::AudioBus;
use super::worker::{DeviceWorker, Worker, WorkerStats};
use crate::audio::devices::DeviceBackend;
use crate::audio::types::{AudioFormat, Result, StreamDirection, WorkerState};

pub struct RenderWorker {
    inner: DeviceWorker,
}

impl RenderWorker {
    pub fn new(backend: Arc<dyn DeviceBackend>, bus: Arc<AudioBus>, format: AudioFormat) -> Self {
        Self::with_priority(backend, bus, format, true)
    }

    pub fn with_priority(
        backend: Arc<dyn DeviceBackend>,
        bus: Arc<AudioBus>,
        format: AudioFormat,
        realtime_priority: bool,
    ) -> Self {
        Self {
            inner: DeviceWorker::new(
                StreamDirection::Render,
                backend,
                bus,
                format,
                realtime_priority,
            ),
        }
    }
}

impl Worker for RenderWorker {
    fn direction(&self) -> StreamDirection {
        self.inner.direction()
    }

    fn start(&mut self) -> Result<AudioFormat> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn state(&self) -> WorkerState {
        self.inner.state()
    }

    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn active_format(&self) -> Option<AudioFormat> {
        self.inner.active_format()
    }

    fn set_format(&mut self, format: AudioFormat) -> Result<()> {
        self.inner.set_format(format)
    }

    fn stats(&self) -> WorkerStats {
        self.inner.stats()
    }
}
