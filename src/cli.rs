//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::error::Result;
use crate::params::{RangeMode, RunConfig, SonificationMode};

/// Band table selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Default,
    Custom,
}

impl From<ModeArg> for RangeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => RangeMode::Default,
            ModeArg::Custom => RangeMode::Custom,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// Procedural scene
    Simulated,
    /// Image files replayed from a directory
    Directory(PathBuf),
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "thermosense")]
#[command(about = "Thermal camera to spatial soundscape sonifier", long_about = None)]
pub struct Args {
    /// TOML configuration file (CLI flags override its values)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Band table: built-in default or the [[ranges]] from the config file
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Output sample rate (Hz)
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Soundscape length per frame (seconds)
    #[arg(long, value_name = "SECONDS")]
    pub sweep: Option<f32>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Pause between frames (milliseconds)
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Frame source: "simulated" or a directory of images
    #[arg(long, value_name = "SOURCE", default_value = "simulated")]
    pub source: String,

    /// Parent directory for run results
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write the CSV log
    #[arg(long)]
    pub no_csv: bool,

    /// Do not write frame snapshots
    #[arg(long)]
    pub no_frame: bool,

    /// Do not write WAV files
    #[arg(long)]
    pub no_sound: bool,

    /// Do not write cleaned/colorized images
    #[arg(long)]
    pub no_images: bool,

    /// Do not draw frames in the terminal
    #[arg(long)]
    pub no_display: bool,

    /// Do not play soundscapes
    #[arg(long)]
    pub no_playback: bool,

    /// One tone per detected hot/cold region instead of one per column
    #[arg(long)]
    pub objects: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Resolve the run configuration: file (or defaults), then CLI overrides
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut RunConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate_hz = rate;
        }
        if let Some(sweep) = self.sweep {
            config.audio.sweep_duration_s = sweep;
        }
        if self.objects {
            config.audio.mode = SonificationMode::Objects;
        }
        if let Some(frames) = self.frames {
            config.max_frames = Some(frames);
        }
        if let Some(delay) = self.delay_ms {
            config.frame_delay_ms = delay;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }

        // Flags only ever disable
        config.save_csv &= !self.no_csv;
        config.save_frame &= !self.no_frame;
        config.save_sound &= !self.no_sound;
        config.save_images &= !self.no_images;
        config.display_enabled &= !self.no_display;
    }

    pub fn frame_source(&self) -> FrameSource {
        if self.source.eq_ignore_ascii_case("simulated") {
            FrameSource::Simulated
        } else {
            FrameSource::Directory(PathBuf::from(&self.source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["thermosense"]);
        let config = args.run_config().unwrap();
        assert_eq!(config.mode, RangeMode::Default);
        assert!(config.save_csv && config.display_enabled);
        assert_eq!(args.frame_source(), FrameSource::Simulated);
        assert!(!args.no_playback);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "thermosense",
            "--sample-rate",
            "22050",
            "--sweep",
            "1.5",
            "--frames",
            "10",
            "--delay-ms",
            "0",
            "--no-csv",
            "--no-display",
            "--objects",
            "--source",
            "captures",
            "-vv",
        ]);
        let config = args.run_config().unwrap();
        assert_eq!(config.audio.sample_rate_hz, 22050);
        assert_eq!(config.audio.sweep_duration_s, 1.5);
        assert_eq!(config.audio.mode, SonificationMode::Objects);
        assert_eq!(config.max_frames, Some(10));
        assert_eq!(config.frame_delay_ms, 0);
        assert!(!config.save_csv);
        assert!(!config.display_enabled);
        assert!(config.save_sound);
        assert_eq!(args.frame_source(), FrameSource::Directory(PathBuf::from("captures")));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["thermosense", "--sample-rate", "0"]);
        assert!(args.run_config().is_err());
    }

    #[test]
    fn test_config_file_then_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
mode = "custom"
frame_delay_ms = 250

[[ranges]]
name = "Warm"
low = 25.0
high = 40.0
color = "orange"
freq = 300
"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "thermosense",
            "--config",
            path.to_str().unwrap(),
            "--delay-ms",
            "100",
        ]);
        let config = args.run_config().unwrap();
        assert_eq!(config.mode, RangeMode::Custom);
        assert_eq!(config.frame_delay_ms, 100);
        assert_eq!(config.active_ranges().unwrap().len(), 1);
    }
}
