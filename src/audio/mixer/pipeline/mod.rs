// Passthrough pipeline
//
// Layout:
// Capture device → CaptureWorker ─┐
//                                 ├→ AudioBus → RenderWorker → Output device
// Media player → PlaybackTap ─────┘
//
// The tap scales media audio by the media gain before it reaches the bus.

pub mod audio_bus;
pub mod input_worker;
pub mod output_worker;
pub mod pipeline_manager;
pub mod worker;

pub use audio_bus::{AudioBus, BusStats};
pub use input_worker::CaptureWorker;
pub use output_worker::RenderWorker;
pub use pipeline_manager::{PipelineManager, PipelineStats, StartReport};
pub use worker::{negotiate_format, Worker, WorkerStats};
