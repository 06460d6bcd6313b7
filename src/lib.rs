pub mod audio;
pub mod log;

// Re-export the pipeline surface for integrators and tests
pub use audio::{
    apply_gain, mix_additive, AudioBus, AudioFormat, BusStats, CaptureWorker, CpalBackend,
    DeviceBackend, GainChange, GainControls, MockBackend, MockDeviceSpec, MockStreamEvent,
    ObserverId, PipelineConfig, PipelineError, PipelineManager, PipelineStats, PlaybackSource,
    PlaybackTap, RenderWorker, StartReport, StreamDirection, TapInput, Worker, WorkerState,
    WorkerStats,
};
pub use log::{init_logging, is_audio_debug_enabled, set_audio_debug};
