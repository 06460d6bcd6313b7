use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

/// Global flag to control audio debug logging
pub static AUDIO_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set audio debug logging on/off
pub fn set_audio_debug(enabled: bool) {
    AUDIO_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    tracing::info!(
        "🔧 Audio debug logging {}",
        if enabled { "ENABLED" } else { "DISABLED" }
    );
}

/// Check if audio debug logging is enabled
pub fn is_audio_debug_enabled() -> bool {
    AUDIO_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_directive`.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

/// Audio debug macro - only logs if audio debug is enabled
///
/// Meant for the device callbacks, where logging every call would flood the output.
#[macro_export]
macro_rules! audio_debug {
    ($($arg:tt)*) => {
        if $crate::log::AUDIO_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::debug!($($arg)*);
        }
    };
}
