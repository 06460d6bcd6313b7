// Audio utility functions for shared logic across the pipeline

use colored::*;
use tracing::{info, warn};

use super::types::BYTES_PER_SAMPLE;

/// SCHED_RR priority requested for capture/render threads
pub const REALTIME_THREAD_PRIORITY: i32 = 80;

/// Saturate a computed sample to the i16 range, truncating toward zero
#[inline]
pub fn saturate_i16(value: f32) -> i16 {
    // `as` truncates toward zero and maps NaN to 0
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Decode little-endian 16-bit PCM. A trailing odd byte is ignored.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as little-endian 16-bit PCM
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    extend_with_samples(&mut bytes, samples.iter().copied());
    bytes
}

/// Append samples to an existing byte buffer (reused across device callbacks)
pub fn extend_with_samples(bytes: &mut Vec<u8>, samples: impl IntoIterator<Item = i16>) {
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Convert a normalized float sample (-1.0..=1.0) to i16
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    saturate_i16(sample * i16::MAX as f32)
}

/// Convert an i16 sample to a normalized float (-1.0..1.0)
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Promote the calling thread to real-time scheduling.
///
/// Returns false when the platform refuses (typically missing privileges); the
/// caller keeps running at normal priority.
pub fn promote_current_thread(label: &str) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: sched_param is plain data and pthread_self() is always valid
        // for the calling thread.
        let result = unsafe {
            let mut param: libc::sched_param = std::mem::zeroed();
            param.sched_priority = REALTIME_THREAD_PRIORITY;
            libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_RR, &param)
        };

        if result == 0 {
            info!(
                "✅ {}: {} thread priority set to real-time (priority: {})",
                "THREAD_PRIORITY".green(),
                label,
                REALTIME_THREAD_PRIORITY
            );
            true
        } else {
            warn!(
                "⚠️ {}: Failed to set {} thread priority (error {}) - may cause audio dropouts",
                "THREAD_PRIORITY".yellow(),
                label,
                result
            );
            false
        }
    }

    #[cfg(not(unix))]
    {
        warn!(
            "⚠️ {}: Real-time priority not supported on this platform for {} thread",
            "THREAD_PRIORITY".yellow(),
            label
        );
        false
    }
}
