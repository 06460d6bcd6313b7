// Audio mixer module - the passthrough pipeline and its workers

pub mod pipeline;

pub use pipeline::{
    AudioBus, BusStats, CaptureWorker, PipelineManager, PipelineStats, RenderWorker, StartReport,
    Worker, WorkerStats,
};
