//! Stereo soundscape composition.
//!
//! A frame is swept left to right over the sweep duration: column `x` of a
//! `width`-column frame sounds at `x * time_per_column` and is panned with
//! the equal-power law, so loudness stays constant across the stereo field.

use super::synthesis::{peak_gain, ToneSpec, ToneSynth};
use crate::detect::{Region, RegionKind};
use crate::error::{Result, ThermalError};
use crate::frame::CleanedFrame;
use crate::params::{RangeTable, SonificationMode, SoundscapeConfig, Timbre};

/// Interleaved stereo accumulation buffer, `[left, right]` per frame
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    frames: Vec<[f32; 2]>,
}

impl StereoBuffer {
    pub fn silent(len: usize) -> Self {
        Self {
            frames: vec![[0.0; 2]; len],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[[f32; 2]] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [[f32; 2]] {
        &mut self.frames
    }

    /// Overlap-add a mono wave from `start` with per-channel gains.
    /// Samples past the end of the buffer are dropped.
    pub fn mix_mono(&mut self, wave: &[f32], start: usize, gains: (f32, f32)) {
        let Some(dst) = self.frames.get_mut(start..) else {
            return;
        };
        for (frame, &sample) in dst.iter_mut().zip(wave) {
            frame[0] += sample * gains.0;
            frame[1] += sample * gains.1;
        }
    }
}

/// Finished, normalized stereo soundscape for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Soundscape {
    frames: Vec<[f32; 2]>,
    sample_rate_hz: u32,
}

impl Soundscape {
    pub fn new(frames: Vec<[f32; 2]>, sample_rate_hz: u32) -> Self {
        Self {
            frames,
            sample_rate_hz,
        }
    }

    pub fn frames(&self) -> &[[f32; 2]] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Duration (seconds)
    pub fn duration_s(&self) -> f32 {
        self.frames.len() as f32 / self.sample_rate_hz as f32
    }

    /// Largest absolute sample over both channels
    pub fn peak(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|f| f.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }

    pub fn is_silent(&self) -> bool {
        self.frames.iter().all(|f| f[0] == 0.0 && f[1] == 0.0)
    }

    /// Sum of squares per channel over a sample range
    pub fn channel_energy(&self, range: std::ops::Range<usize>) -> (f32, f32) {
        let end = range.end.min(self.frames.len());
        let start = range.start.min(end);
        self.frames[start..end]
            .iter()
            .fold((0.0, 0.0), |(l, r), f| (l + f[0] * f[0], r + f[1] * f[1]))
    }
}

/// Equal-power gains `(sqrt(1 - pan), sqrt(pan))`
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(0.0, 1.0);
    ((1.0 - pan).sqrt(), pan.sqrt())
}

/// Pan position of column `x` in a `width`-column frame
pub fn column_pan(x: f32, width: usize) -> f32 {
    if width <= 1 {
        0.5
    } else {
        x / (width - 1) as f32
    }
}

/// Builds per-frame soundscapes; holds no state between frames
#[derive(Debug, Clone)]
pub struct SoundscapeComposer {
    config: SoundscapeConfig,
    synth: ToneSynth,
}

impl SoundscapeComposer {
    pub fn new(config: SoundscapeConfig) -> Self {
        let synth = ToneSynth::new(&config);
        Self { config, synth }
    }

    pub fn config(&self) -> &SoundscapeConfig {
        &self.config
    }

    pub fn synth(&self) -> &ToneSynth {
        &self.synth
    }

    /// Fresh silent buffer of `sample_rate * sweep_duration` frames
    pub fn buffer(&self) -> StereoBuffer {
        StereoBuffer::silent(self.config.total_samples())
    }

    /// Sample index at which column `x` starts sounding
    fn start_sample(&self, x: f32, time_per_column: f32) -> usize {
        (x * time_per_column * self.config.sample_rate_hz as f32) as usize
    }

    /// Place a mono column wave at column `x` of `width`
    pub fn place(
        &self,
        buffer: &mut StereoBuffer,
        wave: &[f32],
        x: usize,
        width: usize,
        time_per_column: f32,
    ) {
        let start = self.start_sample(x as f32, time_per_column);
        buffer.mix_mono(wave, start, pan_gains(column_pan(x as f32, width)));
    }

    /// Build the soundscape buffer for a frame in the configured mode
    pub fn compose(
        &self,
        frame: &CleanedFrame,
        table: &RangeTable,
        regions: &[Region],
    ) -> StereoBuffer {
        match self.config.mode {
            SonificationMode::Columns => self.compose_columns(frame, table),
            SonificationMode::Objects => self.compose_regions(regions, frame.width()),
        }
    }

    /// One normalized tone per column, voiced by the bands of its pixels
    pub fn compose_columns(&self, frame: &CleanedFrame, table: &RangeTable) -> StereoBuffer {
        let (width, height) = (frame.width(), frame.height());
        let time_per_column = self.config.time_per_column(width);
        let mut buffer = self.buffer();

        for x in 0..width {
            let column = frame.column(x).enumerate();
            let wave = self.synth.column_wave(column, height, table, time_per_column);
            if wave.iter().all(|&s| s == 0.0) {
                continue;
            }
            self.place(&mut buffer, &wave, x, width, time_per_column);
        }

        buffer
    }

    /// One tone per region, spanning its columns and panned at its center
    pub fn compose_regions(&self, regions: &[Region], width: usize) -> StereoBuffer {
        let time_per_column = self.config.time_per_column(width);
        let mut buffer = self.buffer();

        for region in regions {
            let (frequency_hz, timbre) = match region.kind {
                RegionKind::Hot => (self.config.object_hot_freq_hz, Timbre::Brass),
                RegionKind::Cold => (self.config.object_cold_freq_hz, Timbre::Reed),
            };
            let tone = self.synth.render(ToneSpec {
                frequency_hz,
                duration_s: region.width() as f32 * time_per_column,
                timbre,
            });

            let start = self.start_sample(region.start_column as f32, time_per_column);
            let gains = pan_gains(column_pan(region.center(), width));
            buffer.mix_mono(&tone, start, gains);
        }

        buffer
    }

    /// Reject non-finite samples, then peak-normalize to unit amplitude.
    /// An all-zero buffer is returned unchanged.
    pub fn finalize(&self, buffer: StereoBuffer) -> Result<Soundscape> {
        let mut frames = buffer.frames;

        if let Some(index) = frames
            .iter()
            .position(|f| !(f[0].is_finite() && f[1].is_finite()))
        {
            return Err(ThermalError::InvalidAudioData(format!(
                "non-finite sample at frame {}",
                index
            )));
        }

        if let Some(gain) = peak_gain(frames.iter().flatten()) {
            frames.iter_mut().flatten().for_each(|s| *s *= gain);
        }

        Ok(Soundscape::new(frames, self.config.sample_rate_hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::normalize_peak;

    fn composer() -> SoundscapeComposer {
        SoundscapeComposer::new(SoundscapeConfig::default())
    }

    #[test]
    fn test_pan_gains_equal_power() {
        for pan in [0.0, 0.1, 0.5, 0.9, 1.0] {
            let (l, r) = pan_gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1e-6);
        }
        assert_eq!(pan_gains(0.0), (1.0, 0.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
    }

    #[test]
    fn test_column_pan() {
        assert_eq!(column_pan(0.0, 50), 0.0);
        assert_eq!(column_pan(49.0, 50), 1.0);
        assert_eq!(column_pan(0.0, 1), 0.5);
    }

    #[test]
    fn test_place_energy_ratio() {
        let composer = composer();
        let width = 50;
        let tpc = composer.config().time_per_column(width);
        let wave = composer.synth().reed_tone(440.0, tpc);

        for x in [5, 20, 37] {
            let mut buffer = composer.buffer();
            composer.place(&mut buffer, &wave, x, width, tpc);
            let soundscape = Soundscape::new(buffer.frames().to_vec(), 44100);
            let (left, right) = soundscape.channel_energy(0..soundscape.len());

            let pan = column_pan(x as f32, width);
            let expected = pan / (1.0 - pan);
            assert!(((right / left) - expected).abs() < 1e-3 * expected.max(1.0));
        }
    }

    #[test]
    fn test_place_offset() {
        let composer = composer();
        let mut buffer = composer.buffer();
        let wave = vec![1.0; 10];
        composer.place(&mut buffer, &wave, 2, 50, 0.04);

        let start = (2.0f32 * 0.04 * 44100.0) as usize;
        assert_eq!(buffer.frames()[start - 1], [0.0, 0.0]);
        assert!(buffer.frames()[start][0] > 0.0);
        assert_eq!(buffer.frames()[start + 10], [0.0, 0.0]);
    }

    #[test]
    fn test_place_clips_past_end() {
        let composer = composer();
        let mut buffer = composer.buffer();
        let wave = vec![1.0; 10_000];
        composer.place(&mut buffer, &wave, 49, 50, 0.04);
        assert_eq!(buffer.len(), 88200);

        // Entirely beyond the buffer: no effect, no panic
        let mut buffer = composer.buffer();
        composer.place(&mut buffer, &wave, 100, 50, 0.04);
        assert!(buffer.frames().iter().all(|f| *f == [0.0, 0.0]));
    }

    #[test]
    fn test_finalize_normalizes() {
        let composer = composer();
        let mut buffer = StereoBuffer::silent(4);
        buffer.frames_mut()[1] = [0.5, -2.0];
        buffer.frames_mut()[2] = [1.0, 0.25];
        let soundscape = composer.finalize(buffer).unwrap();

        let peak = soundscape.peak();
        assert!(peak <= 1.0 && peak > 0.99 * (1.0 - 1e-6));
        assert!((soundscape.frames()[1][1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_finalize_matches_mono_normalization() {
        let composer = composer();
        let mut buffer = StereoBuffer::silent(3);
        buffer.frames_mut()[0] = [0.3, -0.6];
        buffer.frames_mut()[2] = [1.5, 0.75];
        let mut flat: Vec<f32> = buffer.frames().iter().flatten().copied().collect();
        normalize_peak(&mut flat);

        let soundscape = composer.finalize(buffer).unwrap();
        let stereo: Vec<f32> = soundscape.frames().iter().flatten().copied().collect();
        assert_eq!(stereo, flat);
    }

    #[test]
    fn test_finalize_silent_unchanged() {
        let composer = composer();
        let soundscape = composer.finalize(StereoBuffer::silent(8)).unwrap();
        assert!(soundscape.is_silent());
        assert_eq!(soundscape.len(), 8);
    }

    #[test]
    fn test_finalize_rejects_nan() {
        let composer = composer();
        let mut buffer = StereoBuffer::silent(4);
        buffer.frames_mut()[3] = [f32::NAN, 0.0];
        assert!(matches!(
            composer.finalize(buffer),
            Err(ThermalError::InvalidAudioData(_))
        ));

        let mut buffer = StereoBuffer::silent(4);
        buffer.frames_mut()[0] = [0.0, f32::INFINITY];
        assert!(composer.finalize(buffer).is_err());
    }

    #[test]
    fn test_compose_regions_placement() {
        let composer = composer();
        let regions = [
            Region { kind: RegionKind::Hot, start_column: 0, end_column: 4 },
            Region { kind: RegionKind::Cold, start_column: 45, end_column: 49 },
        ];
        let buffer = composer.compose_regions(&regions, 50);
        let soundscape = composer.finalize(buffer).unwrap();
        assert_eq!(soundscape.len(), 88200);

        // Hot region: first 0.2 s, left-heavy
        let (l, r) = soundscape.channel_energy(0..8820);
        assert!(l > 0.0 && l > 4.0 * r);

        // Cold region: last 0.2 s, right-heavy
        let (l, r) = soundscape.channel_energy(79380..88200);
        assert!(r > 0.0 && r > 4.0 * l);

        // Nothing in between
        let (l, r) = soundscape.channel_energy(20000..70000);
        assert_eq!((l, r), (0.0, 0.0));
    }

    #[test]
    fn test_buffer_length_independent_of_content() {
        let composer = composer();
        let frame = CleanedFrame::from_levels(50, 30, vec![35; 1500]).unwrap();
        let buffer = composer.compose_columns(&frame, &RangeTable::default());
        assert_eq!(buffer.len(), composer.config().total_samples());
        assert_eq!(composer.compose_regions(&[], 50).len(), 88200);
    }
}
