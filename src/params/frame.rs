//! Frame cleaning parameters.

use serde::Deserialize;

/// Frame cleaning configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Cleaned frame width (pixels)
    pub width: u32,

    /// Cleaned frame height (pixels)
    pub height: u32,

    /// Pixels strictly brighter than this are treated as artifacts (8-bit level)
    pub artifact_threshold: u8,

    /// Neighborhood radius used to repaint artifact pixels (pixels)
    pub inpaint_radius: usize,

    /// Mirror the cleaned frame left-right (for sensors that deliver mirrored frames)
    pub mirror_horizontal: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 30,
            artifact_threshold: 100,
            inpaint_radius: 3,
            mirror_horizontal: false,
        }
    }
}
