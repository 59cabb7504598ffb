//! Run configuration: band table selection, output side channels and pacing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::audio::SoundscapeConfig;
use super::frame::CleaningConfig;
use super::ranges::{RangeSpec, RangeTable};
use crate::error::{Result, ThermalError};

/// Which band table is active for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    #[default]
    Default,
    Custom,
}

/// Top-level run configuration
///
/// Every output flag only gates a side channel; the soundscape is computed
/// regardless of which ones are enabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RangeMode,

    /// User-defined bands, used when `mode` is custom and non-empty
    pub ranges: Vec<RangeSpec>,

    pub audio: SoundscapeConfig,

    pub cleaning: CleaningConfig,

    /// Write one CSV row per frame
    pub save_csv: bool,

    /// Write the frame snapshot PNG
    pub save_frame: bool,

    /// Write the per-frame WAV
    pub save_sound: bool,

    /// Write cleaned and colorized PNGs
    pub save_images: bool,

    /// Invoke the renderer
    pub display_enabled: bool,

    /// Pause between frames (milliseconds)
    pub frame_delay_ms: u64,

    /// Sensor read attempts per frame before the frame is skipped
    pub sensor_retries: u32,

    /// Stop after this many processed frames
    pub max_frames: Option<u64>,

    /// Parent directory for run results
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RangeMode::Default,
            ranges: Vec::new(),
            audio: SoundscapeConfig::default(),
            cleaning: CleaningConfig::default(),
            save_csv: true,
            save_frame: true,
            save_sound: true,
            save_images: true,
            display_enabled: true,
            frame_delay_ms: 1000,
            sensor_retries: 5,
            max_frames: None,
            output_dir: PathBuf::from("Results"),
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        if self.cleaning.width == 0 || self.cleaning.height == 0 {
            return Err(ThermalError::InvalidConfig(format!(
                "Cleaned frame size must be non-zero, got {}x{}",
                self.cleaning.width, self.cleaning.height
            )));
        }
        if self.sensor_retries == 0 {
            return Err(ThermalError::InvalidConfig(
                "sensor_retries must be at least 1".to_string(),
            ));
        }
        // Surface table errors at load time rather than on the first frame
        self.active_ranges().map(|_| ())
    }

    /// The band table in effect: the custom one if selected and non-empty,
    /// otherwise the built-in default
    pub fn active_ranges(&self) -> Result<RangeTable> {
        if self.mode == RangeMode::Custom && !self.ranges.is_empty() {
            RangeTable::custom(self.ranges.clone())
        } else {
            Ok(RangeTable::default())
        }
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Whether any persisted artifact is requested
    pub fn persists_anything(&self) -> bool {
        self.save_csv || self.save_frame || self.save_sound || self.save_images
    }
}
