// Pipeline Manager: owns the passthrough pipeline
//
// Manages the whole pipeline lifecycle:
// - Owns the AudioBus and the shared gain controls
// - Starts and stops the capture and render workers
// - Hands out PlaybackTaps bound to the bus
//
// Capture and tap producers are concatenated in the bus in arrival order;
// nothing here sums them.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::audio_bus::{AudioBus, BusStats};
use super::input_worker::CaptureWorker;
use super::output_worker::RenderWorker;
use super::worker::{Worker, WorkerStats};
use crate::audio::devices::{CpalBackend, DeviceBackend};
use crate::audio::effects::GainControls;
use crate::audio::tap::PlaybackTap;
use crate::audio::types::{AudioFormat, PipelineConfig, Result, WorkerState};

/// Which directions came up on `start()`, and at which format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub capture: Option<AudioFormat>,
    pub render: Option<AudioFormat>,
}

impl StartReport {
    /// Both directions are running
    pub fn is_ready(&self) -> bool {
        self.capture.is_some() && self.render.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub is_running: bool,
    pub input_gain: f32,
    pub media_gain: f32,
    pub bus: BusStats,
    pub capture: WorkerStats,
    pub render: WorkerStats,
}

/// Microphone and tapped media in, default output device out
pub struct PipelineManager {
    config: PipelineConfig,
    bus: Arc<AudioBus>,
    gains: Arc<GainControls>,
    capture: CaptureWorker,
    render: RenderWorker,
}

impl PipelineManager {
    /// Pipeline with the default configuration on `backend`
    pub fn new(backend: Arc<dyn DeviceBackend>) -> Self {
        Self::build(PipelineConfig::default(), backend)
    }

    pub fn from_config(config: PipelineConfig, backend: Arc<dyn DeviceBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, backend))
    }

    /// Pipeline bound to the platform's default audio devices
    pub fn with_default_devices() -> Self {
        Self::new(Arc::new(CpalBackend::new()))
    }

    fn build(config: PipelineConfig, backend: Arc<dyn DeviceBackend>) -> Self {
        info!(
            "🏗️ PIPELINE_MANAGER: Creating pipeline on '{}' (capture {}, render {}, bus {} bytes)",
            backend.backend_name(),
            config.capture_format,
            config.render_format,
            config.bus_capacity_bytes
        );

        let bus = Arc::new(AudioBus::with_capacity(config.bus_capacity_bytes));
        let capture = CaptureWorker::with_priority(
            backend.clone(),
            bus.clone(),
            config.capture_format,
            config.realtime_priority,
        );
        let render = RenderWorker::with_priority(
            backend,
            bus.clone(),
            config.render_format,
            config.realtime_priority,
        );

        Self {
            config,
            bus,
            gains: Arc::new(GainControls::new()),
            capture,
            render,
        }
    }

    /// Start both workers. Returns once each has reached Running or failed.
    ///
    /// A direction that fails is logged and left idle; the other one keeps
    /// running.
    pub fn start(&mut self) -> StartReport {
        info!("🚀 PIPELINE_MANAGER: Starting capture and render workers...");

        let report = StartReport {
            capture: start_worker(&mut self.capture),
            render: start_worker(&mut self.render),
        };

        if report.is_ready() {
            info!("✅ PIPELINE_MANAGER: Pipeline running");
        } else {
            warn!(
                "⚠️ PIPELINE_MANAGER: Pipeline partially started (capture: {}, render: {})",
                report.capture.is_some(),
                report.render.is_some()
            );
        }

        report
    }

    /// Stop both workers and release their devices. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        info!("🛑 PIPELINE_MANAGER: Stopping pipeline...");
        self.capture.stop();
        self.render.stop();
        info!("✅ PIPELINE_MANAGER: Pipeline stopped");
    }

    /// At least one worker is running
    pub fn is_running(&self) -> bool {
        self.capture.state() != WorkerState::Idle || self.render.state() != WorkerState::Idle
    }

    pub fn bus(&self) -> Arc<AudioBus> {
        self.bus.clone()
    }

    pub fn gains(&self) -> Arc<GainControls> {
        self.gains.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn input_gain(&self) -> f32 {
        self.gains.input_gain()
    }

    pub fn media_gain(&self) -> f32 {
        self.gains.media_gain()
    }

    /// Returns `Ok(true)` when the value changed
    pub fn set_input_gain(&self, gain: f32) -> Result<bool> {
        self.gains.set_input_gain(gain)
    }

    /// Returns `Ok(true)` when the value changed
    pub fn set_media_gain(&self, gain: f32) -> Result<bool> {
        self.gains.set_media_gain(gain)
    }

    /// A new tap writing into this pipeline's bus. The tap does not keep the
    /// bus alive.
    pub fn playback_tap(&self) -> PlaybackTap {
        PlaybackTap::new(&self.bus, self.gains.clone())
    }

    pub fn set_capture_format(&mut self, format: AudioFormat) -> Result<()> {
        self.capture.set_format(format)?;
        self.config.capture_format = format;
        Ok(())
    }

    pub fn set_render_format(&mut self, format: AudioFormat) -> Result<()> {
        self.render.set_format(format)?;
        self.config.render_format = format;
        Ok(())
    }

    pub fn capture_state(&self) -> WorkerState {
        self.capture.state()
    }

    pub fn render_state(&self) -> WorkerState {
        self.render.state()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            is_running: self.is_running(),
            input_gain: self.gains.input_gain(),
            media_gain: self.gains.media_gain(),
            bus: self.bus.stats(),
            capture: self.capture.stats(),
            render: self.render.stats(),
        }
    }
}

impl Drop for PipelineManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn start_worker(worker: &mut dyn Worker) -> Option<AudioFormat> {
    match worker.start() {
        Ok(format) => Some(format),
        Err(e) => {
            warn!(
                "⚠️ PIPELINE_MANAGER: {} worker not started: {}",
                worker.direction(),
                e
            );
            None
        }
    }
}
