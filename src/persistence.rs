//! On-disk run log: CSV telemetry plus per-frame PNG and WAV artifacts.
//!
//! Layout of one run:
//!
//! ```text
//! <output_dir>/ThermalSense-<YYYY-mm-dd_HH-MM-SS>/
//!     ThermalSense-<timestamp>.csv
//!     frame_000.png          colorized snapshot (upscaled)
//!     frame_000.wav          soundscape
//!     cleaned/frame_000.png  cleaned 8-bit frame
//!     thermal/frame_000.png  colorized frame at working resolution
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::error::{Result, ThermalError};
use crate::frame::{heat_range_label, snapshot, CleanedFrame};
use crate::params::RunConfig;

/// CSV header, one row per processed frame
pub const CSV_HEADER: &str = "frame_number,mean_temperature,heat_range,image_filename,wav_filename,cleaned_image,thermal_image,hot_item_count,cold_item_count,total_item_count";

/// Upscale factor for the snapshot PNG
const SNAPSHOT_SCALE: u32 = 10;

/// Everything one frame hands to persistence
#[derive(Debug, Clone, Copy)]
pub struct FrameArtifacts<'a> {
    pub frame_index: u64,
    /// Mean temperature of the raw frame (°C)
    pub mean_temperature: f32,
    pub cleaned: &'a CleanedFrame,
    pub colors: &'a RgbImage,
    /// Encoded soundscape; absent when audio was suppressed for the frame
    pub wav: Option<&'a [u8]>,
    pub hot_count: usize,
    pub cold_count: usize,
}

/// Per-frame persistence sink. Failures are logged by the caller.
pub trait Persistence {
    fn record(&mut self, artifacts: &FrameArtifacts<'_>) -> Result<()>;

    /// Flush and release anything held open
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Which artifacts get written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveFlags {
    pub csv: bool,
    pub frame: bool,
    pub sound: bool,
    pub images: bool,
}

impl SaveFlags {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            csv: config.save_csv,
            frame: config.save_frame,
            sound: config.save_sound,
            images: config.save_images,
        }
    }
}

/// Run-directory persistence
pub struct FilePersistence {
    run_dir: PathBuf,
    flags: SaveFlags,
    csv: Option<BufWriter<File>>,
}

impl FilePersistence {
    /// Create a timestamped run directory under `output_dir`
    pub fn create(output_dir: &Path, flags: SaveFlags) -> Result<Self> {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let name = format!("ThermalSense-{}", stamp);
        Self::create_named(output_dir, &name, flags)
    }

    /// Create the run directory `output_dir/name` (CSV is `name.csv`)
    pub fn create_named(output_dir: &Path, name: &str, flags: SaveFlags) -> Result<Self> {
        let run_dir = output_dir.join(name);
        fs::create_dir_all(&run_dir)?;
        if flags.images {
            fs::create_dir_all(run_dir.join("cleaned"))?;
            fs::create_dir_all(run_dir.join("thermal"))?;
        }

        let csv = if flags.csv {
            let mut writer = BufWriter::new(File::create(run_dir.join(format!("{}.csv", name)))?);
            writeln!(writer, "{}", CSV_HEADER)?;
            writer.flush()?;
            Some(writer)
        } else {
            None
        };

        info!(dir = %run_dir.display(), "Run directory created");

        Ok(Self {
            run_dir,
            flags,
            csv,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write_png(&self, image: &RgbImage, path: &Path) -> Result<()> {
        image.save(path)?;
        Ok(())
    }

    fn write_frame(&mut self, artifacts: &FrameArtifacts<'_>) -> Result<()> {
        let stem = format!("frame_{:03}", artifacts.frame_index);
        let image_filename = format!("{}.png", stem);
        let wav_filename = format!("{}.wav", stem);
        let cleaned_path = self.run_dir.join("cleaned").join(&image_filename);
        let thermal_path = self.run_dir.join("thermal").join(&image_filename);

        if self.flags.frame {
            self.write_png(
                &snapshot(artifacts.colors, SNAPSHOT_SCALE),
                &self.run_dir.join(&image_filename),
            )?;
        }
        if self.flags.images {
            artifacts.cleaned.as_image().save(&cleaned_path)?;
            self.write_png(artifacts.colors, &thermal_path)?;
        }
        if self.flags.sound {
            if let Some(wav) = artifacts.wav {
                fs::write(self.run_dir.join(&wav_filename), wav)?;
            }
        }

        if let Some(csv) = self.csv.as_mut() {
            let row = [
                artifacts.frame_index.to_string(),
                format!("{:.2}", artifacts.mean_temperature),
                heat_range_label(artifacts.mean_temperature).to_string(),
                image_filename,
                wav_filename,
                cleaned_path.display().to_string(),
                thermal_path.display().to_string(),
                artifacts.hot_count.to_string(),
                artifacts.cold_count.to_string(),
                (artifacts.hot_count + artifacts.cold_count).to_string(),
            ];
            let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
            writeln!(csv, "{}", line.join(","))?;
            csv.flush()?;
        }

        Ok(())
    }
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl Persistence for FilePersistence {
    fn record(&mut self, artifacts: &FrameArtifacts<'_>) -> Result<()> {
        self.write_frame(artifacts)
            .map_err(|e| ThermalError::collaborator("persistence", e))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut csv) = self.csv.take() {
            csv.flush()
                .map_err(|e| ThermalError::collaborator("persistence", e))?;
        }
        Ok(())
    }
}
