// Playback tap type definitions
//
// The media player is an external subsystem; the tap only needs to hand it an
// output handle and read its volume.

use super::virtual_stream::TapInput;

/// An upstream media player whose decoded output can be redirected.
///
/// Implementors must route decoded PCM (in the pipeline format) to the
/// `TapInput` they are given until `disconnect_output` is called.
pub trait PlaybackSource: Send + Sync {
    /// Start writing decoded audio into `output`
    fn connect_output(&self, output: TapInput);

    /// Stop writing to the previously connected output
    fn disconnect_output(&self);

    /// Current player volume, adopted as the media gain on attach
    fn volume(&self) -> f32;
}
