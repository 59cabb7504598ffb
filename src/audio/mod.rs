//! Soundscape synthesis and playback.
//!
//! Each cleaned frame is swept left to right: every column (or, in object
//! mode, every detected region) becomes a short tone placed in time by its
//! horizontal position and panned across the stereo field.

mod composer;
mod output;
mod synthesis;
pub mod wav;

// Re-export public types
pub use composer::{column_pan, pan_gains, Soundscape, SoundscapeComposer, StereoBuffer};
#[cfg(feature = "playback")]
pub use output::CpalOutput;
pub use output::{resample_linear, AudioOutput, NullOutput};
pub use synthesis::{normalize_peak, peak_gain, reference_scale, ToneSpec, ToneSynth};
