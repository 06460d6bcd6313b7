// Device worker threads
//
// Each worker owns one dedicated, long-lived thread whose whole lifetime is:
// resolve default device → negotiate format → open stream bound to the bus →
// wait for a stop request → release the device. The device and its stream
// never leave that thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::audio_bus::AudioBus;
use crate::audio::devices::{AudioDevice, DeviceBackend};
use crate::audio::types::{AudioFormat, PipelineError, Result, StreamDirection, WorkerState};
use crate::audio::utils::promote_current_thread;

/// Common lifecycle of the capture and render workers
pub trait Worker {
    fn direction(&self) -> StreamDirection;

    /// Start the thread and wait until it reports Running (or fails).
    ///
    /// Returns the negotiated format. Starting a running worker is a no-op.
    fn start(&mut self) -> Result<AudioFormat>;

    /// Request a stop and join the thread. Safe to call repeatedly.
    fn stop(&mut self);

    fn state(&self) -> WorkerState;

    fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Format requested for the next start
    fn format(&self) -> AudioFormat;

    /// Format the device is actually running at, while running
    fn active_format(&self) -> Option<AudioFormat>;

    /// Rejected while running; the previous format is kept.
    fn set_format(&mut self, format: AudioFormat) -> Result<()>;

    fn stats(&self) -> WorkerStats;
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub direction: StreamDirection,
    pub state: WorkerState,
    pub requested_format: AudioFormat,
    pub active_format: Option<AudioFormat>,
    pub device_name: Option<String>,
    pub starts: u64,
    pub device_errors: u64,
}

/// Worker state shared between the handle and its thread
#[derive(Debug, Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::Idle.as_u8())))
    }

    fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: WorkerState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// What the thread reports back once the device is (or is not) streaming
type StartOutcome = std::result::Result<(AudioFormat, String), PipelineError>;

/// Thread/device lifecycle shared by `CaptureWorker` and `RenderWorker`
pub(crate) struct DeviceWorker {
    direction: StreamDirection,
    backend: Arc<dyn DeviceBackend>,
    bus: Arc<AudioBus>,
    requested_format: AudioFormat,
    realtime_priority: bool,

    state: SharedState,
    active_format: Option<AudioFormat>,
    device_name: Option<String>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,

    starts: u64,
    device_errors: u64,
}

impl DeviceWorker {
    pub(crate) fn new(
        direction: StreamDirection,
        backend: Arc<dyn DeviceBackend>,
        bus: Arc<AudioBus>,
        format: AudioFormat,
        realtime_priority: bool,
    ) -> Self {
        Self {
            direction,
            backend,
            bus,
            requested_format: format,
            realtime_priority,
            state: SharedState::new(),
            active_format: None,
            device_name: None,
            stop_tx: None,
            thread: None,
            starts: 0,
            device_errors: 0,
        }
    }

    pub(crate) fn direction(&self) -> StreamDirection {
        self.direction
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.state.load()
    }

    pub(crate) fn format(&self) -> AudioFormat {
        self.requested_format
    }

    pub(crate) fn active_format(&self) -> Option<AudioFormat> {
        self.active_format
    }

    pub(crate) fn set_format(&mut self, format: AudioFormat) -> Result<()> {
        if self.thread.is_some() {
            warn!(
                "⚠️ {}_WORKER: Cannot change format to {} while running (keeping {})",
                self.label(),
                format,
                self.active_format.unwrap_or(self.requested_format)
            );
            return Err(PipelineError::FormatLocked {
                direction: self.direction,
            });
        }

        self.requested_format = format;
        Ok(())
    }

    pub(crate) fn start(&mut self) -> Result<AudioFormat> {
        if let (Some(format), Some(_)) = (self.active_format, self.thread.as_ref()) {
            debug!("{}_WORKER: Already running at {}", self.label(), format);
            return Ok(format);
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = channel::bounded::<StartOutcome>(1);

        let context = ThreadContext {
            direction: self.direction,
            backend: self.backend.clone(),
            bus: self.bus.clone(),
            requested: self.requested_format,
            realtime_priority: self.realtime_priority,
            state: self.state.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("audio-{}", self.direction))
            .spawn(move || run_device_thread(context, stop_rx, ready_tx))
            .map_err(|source| PipelineError::WorkerSpawn {
                direction: self.direction,
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok((format, device_name))) => {
                self.starts += 1;
                self.active_format = Some(format);
                self.device_name = Some(device_name);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(handle);
                info!(
                    "✅ {}_WORKER: Running at {} on '{}'",
                    self.label(),
                    format,
                    self.device_name.as_deref().unwrap_or("unknown")
                );
                Ok(format)
            }
            Ok(Err(e)) => {
                // The thread has already released everything; reap it
                let _ = handle.join();
                self.state.store(WorkerState::Idle);
                Err(e)
            }
            Err(_) => {
                if handle.join().is_err() {
                    error!("❌ {}_WORKER: Thread panicked during start", self.label());
                }
                self.state.store(WorkerState::Idle);
                Err(PipelineError::WorkerLost {
                    direction: self.direction,
                })
            }
        }
    }

    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.thread.take() else {
            debug!("{}_WORKER: Stop requested while idle", self.label());
            return;
        };

        info!("🛑 {}_WORKER: Stopping...", self.label());
        self.state.store(WorkerState::Stopping);

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        // No timeout: an unresponsive driver blocks here
        match handle.join() {
            Ok(errors) => self.device_errors += errors,
            Err(_) => error!("❌ {}_WORKER: Thread panicked while stopping", self.label()),
        }

        self.state.store(WorkerState::Idle);
        self.active_format = None;
        info!("✅ {}_WORKER: Stopped", self.label());
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        WorkerStats {
            direction: self.direction,
            state: self.state(),
            requested_format: self.requested_format,
            active_format: self.active_format,
            device_name: self.device_name.clone(),
            starts: self.starts,
            device_errors: self.device_errors,
        }
    }

    fn label(&self) -> &'static str {
        match self.direction {
            StreamDirection::Capture => "CAPTURE",
            StreamDirection::Render => "RENDER",
        }
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pick the format to open the device with, falling back to the device's
/// preferred format when the requested one is unsupported.
pub fn negotiate_format(device: &dyn AudioDevice, requested: AudioFormat) -> AudioFormat {
    if device.supports_format(&requested) {
        return requested;
    }

    let preferred = device.preferred_format();
    warn!(
        "⚠️ FORMAT_NEGOTIATION: {} device '{}' does not support {}, using its preferred {}",
        device.direction(),
        device.name(),
        requested,
        preferred
    );
    preferred
}

struct ThreadContext {
    direction: StreamDirection,
    backend: Arc<dyn DeviceBackend>,
    bus: Arc<AudioBus>,
    requested: AudioFormat,
    realtime_priority: bool,
    state: SharedState,
}

/// Body of the worker thread. Returns the number of device errors seen.
fn run_device_thread(
    context: ThreadContext,
    stop_rx: Receiver<()>,
    ready_tx: Sender<StartOutcome>,
) -> u64 {
    let direction = context.direction;

    if context.realtime_priority {
        promote_current_thread(&direction.to_string());
    }

    let Some(device) = context.backend.default_device(direction) else {
        warn!(
            "⚠️ {}_THREAD: No default {} device on backend '{}'",
            direction.to_string().to_uppercase(),
            direction,
            context.backend.backend_name()
        );
        let _ = ready_tx.send(Err(PipelineError::DeviceUnavailable { direction }));
        return 0;
    };

    let device_name = device.name();
    let format = negotiate_format(device.as_ref(), context.requested);
    let (error_tx, error_rx) = channel::bounded::<String>(16);

    let mut stream = match device.open_stream(format, context.bus.clone(), error_tx) {
        Ok(stream) => stream,
        Err(source) => {
            warn!(
                "⚠️ {}_THREAD: Failed to open '{}': {:#}",
                direction.to_string().to_uppercase(),
                device_name,
                source
            );
            let _ = ready_tx.send(Err(PipelineError::StreamOpen { direction, source }));
            return 0;
        }
    };

    context.state.store(WorkerState::Running);
    let _ = ready_tx.send(Ok((format, device_name.clone())));

    let mut device_errors = 0u64;
    loop {
        crossbeam::channel::select! {
            recv(stop_rx) -> _ => break,
            recv(error_rx) -> message => match message {
                Ok(message) => {
                    device_errors += 1;
                    warn!("⚠️ {} device '{}' reported: {}", direction, device_name, message);
                }
                // Stream dropped its error sender; only a stop can follow
                Err(_) => {
                    let _ = stop_rx.recv();
                    break;
                }
            },
        }
    }

    if let Err(e) = stream.pause() {
        warn!("⚠️ Failed to pause {} stream on '{}': {:#}", direction, device_name, e);
    }
    drop(stream);
    drop(device);

    info!(
        "🛑 {}_THREAD: Released '{}' ({} device errors)",
        direction.to_string().to_uppercase(),
        device_name,
        device_errors
    );
    device_errors
}
