//! Frame sources.
//!
//! The controller only sees the [`Sensor`] trait; hardware drivers live
//! outside this crate. Two sources ship with it: a procedural scene for
//! running without hardware, and a replay of image files from a directory.

use std::path::{Path, PathBuf};

use noise::{NoiseFn, OpenSimplex};
use tracing::debug;

use crate::error::{Result, ThermalError};
use crate::frame::{FrameInput, RawFrame};

/// Blocking frame source. May fail transiently; the controller retries.
pub trait Sensor {
    fn get_frame(&mut self) -> Result<FrameInput>;
}

/// Procedural thermal scene parameters
#[derive(Debug, Clone)]
pub struct SceneParams {
    /// Grid width (columns)
    pub width: usize,

    /// Grid height (rows)
    pub height: usize,

    /// Background temperature (°C)
    pub ambient_c: f32,

    /// Amplitude of the background texture (°C)
    pub texture_c: f32,

    /// Hot blob peak offset above ambient (°C)
    pub hot_offset_c: f32,

    /// Cold blob peak offset below ambient (°C)
    pub cold_offset_c: f32,

    /// Blob radius (grid cells, one standard deviation)
    pub blob_radius: f32,

    /// Blob drift per frame (radians of orbit)
    pub drift_per_frame: f32,

    /// Noise seed
    pub seed: u32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            width: 32,
            height: 24,
            ambient_c: 25.0,
            texture_c: 1.5,
            hot_offset_c: 15.0, // Peaks around 40 °C, inside the default Hot band
            cold_offset_c: 15.0,
            blob_radius: 3.0,
            drift_per_frame: 0.15,
            seed: 42,
        }
    }
}

/// Synthetic 24×32 scene: ambient background, a hot blob and a cold blob
/// drifting on opposite orbits, OpenSimplex texture on top
pub struct SimulatedSensor {
    params: SceneParams,
    simplex: OpenSimplex,
    frame_count: u64,
}

impl SimulatedSensor {
    pub fn new(params: SceneParams) -> Self {
        let simplex = OpenSimplex::new(params.seed);
        Self {
            params,
            simplex,
            frame_count: 0,
        }
    }

    /// Texture sample in [-1, 1]
    fn texture(&self, x: usize, y: usize, t: f64) -> f32 {
        self.simplex.get([x as f64 * 0.25, y as f64 * 0.25, t * 0.1]) as f32
    }

    /// Blob centers for frame `t`: hot orbits the left half, cold the right
    fn blob_centers(&self, t: f32) -> ((f32, f32), (f32, f32)) {
        let w = self.params.width as f32;
        let h = self.params.height as f32;
        let phase = t * self.params.drift_per_frame;

        let hot = (
            w * 0.25 + w * 0.15 * phase.cos(),
            h * 0.5 + h * 0.25 * phase.sin(),
        );
        let cold = (
            w * 0.75 - w * 0.15 * phase.cos(),
            h * 0.5 - h * 0.25 * phase.sin(),
        );
        (hot, cold)
    }

    /// Render the scene for the next frame
    pub fn next_frame(&mut self) -> Result<RawFrame> {
        let p = &self.params;
        let t = self.frame_count as f32;
        let (hot, cold) = self.blob_centers(t);
        let two_sigma_sq = 2.0 * p.blob_radius * p.blob_radius;

        let mut frame = RawFrame::filled(p.width, p.height, p.ambient_c)?;
        for y in 0..p.height {
            for x in 0..p.width {
                let (fx, fy) = (x as f32, y as f32);
                let hot_falloff =
                    (-((fx - hot.0).powi(2) + (fy - hot.1).powi(2)) / two_sigma_sq).exp();
                let cold_falloff =
                    (-((fx - cold.0).powi(2) + (fy - cold.1).powi(2)) / two_sigma_sq).exp();

                let value = p.ambient_c
                    + p.texture_c * self.texture(x, y, t as f64)
                    + p.hot_offset_c * hot_falloff
                    - p.cold_offset_c * cold_falloff;
                frame.set(x, y, value);
            }
        }

        self.frame_count += 1;
        Ok(frame)
    }
}

impl Sensor for SimulatedSensor {
    fn get_frame(&mut self) -> Result<FrameInput> {
        Ok(self.next_frame()?.into())
    }
}

/// Replays image files from a directory in file-name order, wrapping around
/// at the end. Files are decoded by the cleaner, so an undecodable file
/// surfaces as `InvalidSource` for that frame only.
#[derive(Debug)]
pub struct ImageSequenceSensor {
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSensor {
    pub fn new(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(ThermalError::InvalidConfig(format!(
                "no frame files in {}",
                dir.display()
            )));
        }
        debug!(count = files.len(), dir = %dir.display(), "Image sequence loaded");

        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Sensor for ImageSequenceSensor {
    fn get_frame(&mut self) -> Result<FrameInput> {
        let path = self.files[self.next].clone();
        self.next = (self.next + 1) % self.files.len();
        Ok(FrameInput::Path(path))
    }
}
