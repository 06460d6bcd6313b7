// Capture worker: microphone → AudioBus
//
// Owns a dedicated thread bound to the default input device. The device
// callback writes raw captured PCM straight into the bus; the input gain
// control is not applied on this path.

use std::sync::Arc;

use super::audio_bus::AudioBus;
use super::worker::{DeviceWorker, Worker, WorkerStats};
use crate::audio::devices::DeviceBackend;
use crate::audio::types::{AudioFormat, Result, StreamDirection, WorkerState};

pub struct CaptureWorker {
    inner: DeviceWorker,
}

impl CaptureWorker {
    pub fn new(backend: Arc<dyn DeviceBackend>, bus: Arc<AudioBus>, format: AudioFormat) -> Self {
        Self::with_priority(backend, bus, format, true)
    }

    /// `realtime_priority = false` keeps the thread at normal priority
    pub fn with_priority(
        backend: Arc<dyn DeviceBackend>,
        bus: Arc<AudioBus>,
        format: AudioFormat,
        realtime_priority: bool,
    ) -> Self {
        Self {
            inner: DeviceWorker::new(
                StreamDirection::Capture,
                backend,
                bus,
                format,
                realtime_priority,
            ),
        }
    }
}

impl Worker for CaptureWorker {
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
