pub mod gain;

pub use gain::{apply_gain, mix_additive, GainChange, GainControls, GainObserver, ObserverId};
