// Playback tap: media player output → AudioBus
//
// The tap looks like an output device to the player. Every chunk written to
// it is scaled by the media gain and appended to the bus. It holds the bus
// weakly, so a tap outliving its pipeline turns into a silent sink.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, info, warn};

use super::types::PlaybackSource;
use crate::audio::effects::{apply_gain, GainControls};
use crate::audio::mixer::pipeline::AudioBus;
use crate::audio::types::Result;

/// Output handle given to an attached player
#[derive(Debug, Clone)]
pub struct TapInput {
    bus: Weak<AudioBus>,
    gains: Arc<GainControls>,
}

impl TapInput {
    pub(crate) fn new(bus: &Arc<AudioBus>, gains: Arc<GainControls>) -> Self {
        Self {
            bus: Arc::downgrade(bus),
            gains,
        }
    }

    /// Scale `bytes` by the media gain and append them to the bus.
    ///
    /// Always reports the full length as written, even when the pipeline is
    /// gone and the audio is discarded.
    pub fn write_pcm(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let Some(bus) = self.bus.upgrade() else {
            crate::audio_debug!(
                "🔇 PLAYBACK_TAP: Pipeline gone, discarding {} bytes",
                bytes.len()
            );
            return bytes.len();
        };

        let mut scaled = bytes.to_vec();
        apply_gain(&mut scaled, self.gains.media_gain());
        bus.write(&scaled);
        bytes.len()
    }

    /// Forward a player volume change to the media gain
    pub fn set_volume(&self, volume: f32) -> Result<bool> {
        self.gains.set_media_gain(volume)
    }

    /// The pipeline this handle writes into still exists
    pub fn is_connected(&self) -> bool {
        self.bus.strong_count() > 0
    }
}

impl io::Write for TapInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_pcm(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Redirects a media player's decoded output into the pipeline
pub struct PlaybackTap {
    input: TapInput,
    source: Mutex<Option<Weak<dyn PlaybackSource>>>,
    // Held for a whole attach or detach so a rebind never interleaves with another
    rebind: Mutex<()>,
}

impl PlaybackTap {
    pub fn new(bus: &Arc<AudioBus>, gains: Arc<GainControls>) -> Self {
        Self {
            input: TapInput::new(bus, gains),
            source: Mutex::new(None),
            rebind: Mutex::new(()),
        }
    }

    /// The handle players write into
    pub fn input(&self) -> TapInput {
        self.input.clone()
    }

    /// Route `source`'s output into the tap.
    ///
    /// A previously attached source is disconnected first. Attaching the
    /// same source again does nothing.
    ///
    /// The player's volume replaces the current media gain, including a gain
    /// set before attaching. Set the media gain after attaching (or through
    /// the player) to override it.
    ///
    /// Concurrent attach and detach calls are serialized. Source callbacks
    /// must not call back into `attach_playback_source` or `detach`.
    pub fn attach_playback_source(&self, source: &Arc<dyn PlaybackSource>) {
        let _rebind = self.lock_rebind();
        let previous = {
            let mut slot = self.lock_source();
            if let Some(current) = slot.as_ref() {
                if same_source(current, source) && current.strong_count() > 0 {
                    debug!("PLAYBACK_TAP: Source already attached");
                    return;
                }
            }
            slot.replace(Arc::downgrade(source))
        };

        if let Some(previous) = previous.and_then(|weak| weak.upgrade()) {
            info!("🔌 PLAYBACK_TAP: Releasing previous playback source");
            previous.disconnect_output();
        }

        let volume = source.volume();
        if volume.is_finite() {
            if let Err(e) = self.input.set_volume(volume) {
                warn!("⚠️ PLAYBACK_TAP: Could not adopt player volume: {}", e);
            }
        } else {
            warn!(
                "⚠️ PLAYBACK_TAP: Ignoring non-finite player volume {}",
                volume
            );
        }

        source.connect_output(self.input.clone());
        info!(
            "🔗 PLAYBACK_TAP: Playback source attached (media gain {})",
            self.input.gains.media_gain()
        );
    }

    /// Disconnect the attached source. Returns true when a live source was
    /// released.
    pub fn detach(&self) -> bool {
        let _rebind = self.lock_rebind();
        let previous = self.lock_source().take();
        match previous.and_then(|weak| weak.upgrade()) {
            Some(source) => {
                source.disconnect_output();
                info!("🔌 PLAYBACK_TAP: Playback source detached");
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock_source()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Push decoded PCM directly, bypassing any attached source.
    ///
    /// Same gain and bus path as audio written by the player.
    pub fn inject_decoded_audio(&self, bytes: &[u8]) -> usize {
        self.input.write_pcm(bytes)
    }

    fn lock_rebind(&self) -> MutexGuard<'_, ()> {
        self.rebind
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<Weak<dyn PlaybackSource>>> {
        self.source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl io::Write for PlaybackTap {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.inject_decoded_audio(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Write-only: reads always yield no data
impl io::Read for PlaybackTap {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Drop for PlaybackTap {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for PlaybackTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackTap")
            .field("input", &self.input)
            .field("attached", &self.is_attached())
            .finish()
    }
}

fn same_source(current: &Weak<dyn PlaybackSource>, candidate: &Arc<dyn PlaybackSource>) -> bool {
    std::ptr::eq(
        current.as_ptr() as *const (),
        Arc::as_ptr(candidate) as *const (),
    )
}
