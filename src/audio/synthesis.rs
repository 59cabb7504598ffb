//! Tone synthesis: pitch quantization plus the brass and reed voices.

use std::f32::consts::PI;

use crate::params::audio_constants::{
    PITCH_REFERENCE_HZ, SCALE_LEN, SCALE_OCTAVES, SCALE_RATIOS, SCALE_ROOT_HZ,
};
use crate::params::{RangeTable, SoundscapeConfig, Timbre};

/// Reference scale: every ratio in every octave, octave-major order
pub fn reference_scale() -> [f32; SCALE_LEN] {
    let mut scale = [0.0; SCALE_LEN];
    for octave in 0..SCALE_OCTAVES {
        for (i, ratio) in SCALE_RATIOS.iter().enumerate() {
            scale[octave * SCALE_RATIOS.len() + i] = SCALE_ROOT_HZ * ratio * (1 << octave) as f32;
        }
    }
    scale
}

/// Input to a single tone render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub duration_s: f32,
    pub timbre: Timbre,
}

/// Mono tone generator
#[derive(Debug, Clone)]
pub struct ToneSynth {
    sample_rate_hz: u32,
    pitch_base_hz: f32,
    pitch_span_hz: f32,
    scale: [f32; SCALE_LEN],
}

impl ToneSynth {
    pub fn new(config: &SoundscapeConfig) -> Self {
        Self {
            sample_rate_hz: config.sample_rate_hz,
            pitch_base_hz: config.pitch_base_hz,
            pitch_span_hz: config.pitch_span_hz,
            scale: reference_scale(),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Samples needed for `duration_s` (truncated)
    pub fn samples_for(&self, duration_s: f32) -> usize {
        (self.sample_rate_hz as f32 * duration_s) as usize
    }

    /// Map a row to a pitch (top row highest) and snap it to the scale.
    ///
    /// Ties go to the earlier scale entry.
    pub fn quantize_pitch(&self, row: usize, total_rows: usize) -> f32 {
        let rows = total_rows.max(1) as f32;
        let raw = self.pitch_base_hz + ((rows - row as f32) / rows) * self.pitch_span_hz;

        let mut best = self.scale[0];
        for &candidate in &self.scale[1..] {
            if (candidate - raw).abs() < (best - raw).abs() {
                best = candidate;
            }
        }
        best
    }

    /// Render a tone of the given timbre
    pub fn render(&self, spec: ToneSpec) -> Vec<f32> {
        match spec.timbre {
            Timbre::Brass => self.brass_tone(spec.frequency_hz, spec.duration_s),
            Timbre::Reed => self.reed_tone(spec.frequency_hz, spec.duration_s),
        }
    }

    /// Fundamental plus 2nd and 3rd harmonics (1.0 / 0.3 / 0.2), scaled by 0.5
    pub fn brass_tone(&self, freq_hz: f32, duration_s: f32) -> Vec<f32> {
        self.sample_times(duration_s)
            .map(|t| {
                let phase = 2.0 * PI * freq_hz * t;
                0.5 * (phase.sin() + 0.3 * (2.0 * phase).sin() + 0.2 * (3.0 * phase).sin())
            })
            .collect()
    }

    /// Sine with a 5 Hz, 2% phase vibrato, scaled by 0.4
    pub fn reed_tone(&self, freq_hz: f32, duration_s: f32) -> Vec<f32> {
        self.sample_times(duration_s)
            .map(|t| {
                let vibrato = 0.02 * (2.0 * PI * 5.0 * t).sin();
                0.4 * (2.0 * PI * freq_hz * t + vibrato).sin()
            })
            .collect()
    }

    /// Sum the tones of every voiced pixel in a column, then peak-normalize.
    ///
    /// `column` yields `(row, value)` pairs. Pixels in no band, or in a band
    /// with zero base frequency, contribute nothing.
    pub fn column_wave(
        &self,
        column: impl Iterator<Item = (usize, f32)>,
        total_rows: usize,
        table: &RangeTable,
        duration_s: f32,
    ) -> Vec<f32> {
        let mut wave = vec![0.0f32; self.samples_for(duration_s)];

        for (row, value) in column {
            let Some(band) = table.band_for(value) else {
                continue;
            };
            if band.is_silent() {
                continue;
            }

            let frequency_hz =
                band.tone_freq_hz * self.quantize_pitch(row, total_rows) / PITCH_REFERENCE_HZ;
            let tone = self.render(ToneSpec {
                frequency_hz,
                duration_s,
                timbre: band.timbre,
            });
            for (acc, sample) in wave.iter_mut().zip(tone) {
                *acc += sample;
            }
        }

        normalize_peak(&mut wave);
        wave
    }

    /// Sample instants `i * duration / n` for `n = samples_for(duration)`
    fn sample_times(&self, duration_s: f32) -> impl Iterator<Item = f32> {
        let n = self.samples_for(duration_s);
        let step = if n > 0 { duration_s / n as f32 } else { 0.0 };
        (0..n).map(move |i| i as f32 * step)
    }
}

/// Gain that brings the largest magnitude to just under one, None for silence
pub fn peak_gain<'a>(samples: impl IntoIterator<Item = &'a f32>) -> Option<f32> {
    use crate::params::audio_constants::NORMALIZE_EPSILON;

    let peak = samples.into_iter().fold(0.0f32, |m, s| m.max(s.abs()));
    (peak > 0.0).then(|| 1.0 / (peak + NORMALIZE_EPSILON))
}

/// Scale so the largest magnitude is (just under) one; silent input is left alone
pub fn normalize_peak(samples: &mut [f32]) {
    if let Some(gain) = peak_gain(samples.iter()) {
        samples.iter_mut().for_each(|s| *s *= gain);
    }
}
