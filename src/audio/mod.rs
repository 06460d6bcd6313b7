// Audio module - live passthrough mixer
//
// - types: formats, configuration and errors
// - devices: default input/output device backends
// - effects: gain stage
// - mixer: audio bus, capture/render workers, pipeline manager
// - tap: media player interception
// - utils: sample conversion and thread priority helpers

pub mod devices;
pub mod effects;
pub mod mixer;
pub mod tap;
pub mod types;
pub mod utils;

pub use types::{
    AudioFormat, PipelineConfig, PipelineError, Result, StreamDirection, WorkerState,
    DEFAULT_BUS_CAPACITY_BYTES, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};

pub use devices::{
    ActiveStream, AudioDevice, CpalBackend, DeviceBackend, MockBackend, MockDeviceSpec,
    MockStreamEvent,
};

pub use effects::{apply_gain, mix_additive, GainChange, GainControls, ObserverId};

pub use mixer::{
    AudioBus, BusStats, CaptureWorker, PipelineManager, PipelineStats, RenderWorker, StartReport,
    Worker, WorkerStats,
};

pub use tap::{PlaybackSource, PlaybackTap, TapInput};
