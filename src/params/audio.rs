//! Soundscape synthesis configuration and constants.

use serde::Deserialize;

use crate::error::{Result, ThermalError};

/// How a cleaned frame is turned into sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SonificationMode {
    /// One tone per column, pitched by row and colored by band
    #[default]
    Columns,

    /// One tone per detected hot/cold region
    Objects,
}

/// Soundscape synthesis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SoundscapeConfig {
    /// Output sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Length of one frame's soundscape (seconds)
    /// The frame is swept left to right over this duration
    pub sweep_duration_s: f32,

    /// Lowest unquantized row pitch (Hz), reached at the bottom row
    pub pitch_base_hz: f32,

    /// Row pitch span above the base (Hz), reached at the top row
    pub pitch_span_hz: f32,

    /// Tone for hot regions in object mode (Hz)
    pub object_hot_freq_hz: f32,

    /// Tone for cold regions in object mode (Hz)
    pub object_cold_freq_hz: f32,

    /// Per-column or per-region sonification
    pub mode: SonificationMode,
}

impl Default for SoundscapeConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            sweep_duration_s: 2.0,
            pitch_base_hz: 300.0,
            pitch_span_hz: 700.0,
            object_hot_freq_hz: 880.0,
            object_cold_freq_hz: 440.0,
            mode: SonificationMode::Columns,
        }
    }
}

impl SoundscapeConfig {
    /// Total stereo frames in one soundscape
    pub fn total_samples(&self) -> usize {
        (self.sample_rate_hz as f32 * self.sweep_duration_s) as usize
    }

    /// Sweep time allotted to a single column (seconds)
    pub fn time_per_column(&self, width: usize) -> f32 {
        self.sweep_duration_s / width.max(1) as f32
    }

    /// Validate configuration (positive rate and duration)
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(ThermalError::InvalidConfig(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if !(self.sweep_duration_s.is_finite() && self.sweep_duration_s > 0.0) {
            return Err(ThermalError::InvalidConfig(format!(
                "Sweep duration must be > 0, got {}",
                self.sweep_duration_s
            )));
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Root of the reference scale (Hz), A3
    pub const SCALE_ROOT_HZ: f32 = 220.0;

    /// Interval ratios within one octave of the reference scale
    pub const SCALE_RATIOS: [f32; 5] = [1.0, 1.125, 1.25, 1.5, 1.875];

    /// Octaves spanned by the reference scale
    pub const SCALE_OCTAVES: usize = 4;

    /// Number of discrete reference pitches
    pub const SCALE_LEN: usize = SCALE_RATIOS.len() * SCALE_OCTAVES;

    /// Band frequencies are expressed relative to this pitch (Hz)
    pub const PITCH_REFERENCE_HZ: f32 = 440.0;

    /// Guard added to peak values before dividing
    pub const NORMALIZE_EPSILON: f32 = 1e-6;
}
