// Gain stage: per-sample volume scaling and additive mixing with saturation
//
// All buffers are little-endian 16-bit signed PCM bytes, the format the bus carries.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::audio::types::{PipelineError, Result, BYTES_PER_SAMPLE};
use crate::audio::utils::saturate_i16;

/// Scale every sample in place by `gain`, saturating to the i16 range.
///
/// A trailing odd byte is left untouched.
pub fn apply_gain(buffer: &mut [u8], gain: f32) {
    if gain == 1.0 {
        return;
    }

    for pair in buffer.chunks_exact_mut(BYTES_PER_SAMPLE) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        let scaled = saturate_i16(sample as f32 * gain);
        pair.copy_from_slice(&scaled.to_le_bytes());
    }
}

/// Sum two PCM streams sample by sample with saturation.
///
/// The output covers the shorter input, rounded down to a whole sample.
pub fn mix_additive(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().min(b.len());
    let len = len - (len % BYTES_PER_SAMPLE);

    let mut output = Vec::with_capacity(len);
    for (left, right) in a[..len]
        .chunks_exact(BYTES_PER_SAMPLE)
        .zip(b[..len].chunks_exact(BYTES_PER_SAMPLE))
    {
        let left = i16::from_le_bytes([left[0], left[1]]) as f32;
        let right = i16::from_le_bytes([right[0], right[1]]) as f32;
        output.extend_from_slice(&saturate_i16(left + right).to_le_bytes());
    }
    output
}

/// Which gain changed, and its new value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainChange {
    Input(f32),
    Media(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type GainObserver = Arc<dyn Fn(GainChange) + Send + Sync>;

/// Shared input/media gain values with change notification.
///
/// Values are plain atomic scalars; a reader sees the latest completed write.
/// Observers fire only when a value actually changes.
pub struct GainControls {
    input_gain: AtomicU32,
    media_gain: AtomicU32,
    revision: AtomicU64,
    next_observer: AtomicU64,
    observers: Mutex<Vec<(ObserverId, GainObserver)>>,
}

impl GainControls {
    pub fn new() -> Self {
        Self {
            input_gain: AtomicU32::new(1.0f32.to_bits()),
            media_gain: AtomicU32::new(1.0f32.to_bits()),
            revision: AtomicU64::new(0),
            next_observer: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn input_gain(&self) -> f32 {
        f32::from_bits(self.input_gain.load(Ordering::Acquire))
    }

    pub fn media_gain(&self) -> f32 {
        f32::from_bits(self.media_gain.load(Ordering::Acquire))
    }

    /// Returns `Ok(true)` when the value changed.
    ///
    /// Input gain is observable but the live capture path writes raw bytes.
    pub fn set_input_gain(&self, gain: f32) -> Result<bool> {
        self.store(&self.input_gain, gain, GainChange::Input(gain))
    }

    /// Returns `Ok(true)` when the value changed.
    pub fn set_media_gain(&self, gain: f32) -> Result<bool> {
        self.store(&self.media_gain, gain, GainChange::Media(gain))
    }

    /// Incremented once per actual change of either gain
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(GainChange) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.lock_observers().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.lock_observers();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    fn store(&self, slot: &AtomicU32, gain: f32, change: GainChange) -> Result<bool> {
        if !gain.is_finite() {
            warn!("⚠️ GAIN_CONTROLS: Rejected non-finite gain {:?}", change);
            return Err(PipelineError::InvalidGain(gain));
        }

        let previous = f32::from_bits(slot.swap(gain.to_bits(), Ordering::AcqRel));
        if previous == gain {
            return Ok(false);
        }

        self.revision.fetch_add(1, Ordering::AcqRel);
        debug!("🎚️ GAIN_CONTROLS: {:?} (was {})", change, previous);

        // Observers run outside the lock so they may (un)subscribe re-entrantly
        let observers: Vec<GainObserver> = self
            .lock_observers()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(change);
        }

        Ok(true)
    }

    fn lock_observers(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, GainObserver)>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for GainControls {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GainControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GainControls")
            .field("input_gain", &self.input_gain())
            .field("media_gain", &self.media_gain())
            .field("revision", &self.revision())
            .field("observers", &self.lock_observers().len())
            .finish()
    }
}
