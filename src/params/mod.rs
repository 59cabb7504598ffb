//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers live here with:
//! - Physical units (Hz, seconds, °C)
//! - Documented ranges and meanings
//! - Validation at load time

mod audio;
mod frame;
mod ranges;
mod run;

// Re-export all types
pub use audio::{audio_constants, SonificationMode, SoundscapeConfig};
pub use frame::CleaningConfig;
pub use ranges::{Color, RangeEntry, RangeSpec, RangeTable, Timbre};
pub use run::{RangeMode, RunConfig};
