// Playback tap module - redirects a media player's output into the pipeline
//
// - types: the PlaybackSource contract a media player implements
// - virtual_stream: the tap itself and the output handle players write into
pub mod types;
pub mod virtual_stream;

pub use types::PlaybackSource;
pub use virtual_stream::{PlaybackTap, TapInput};
