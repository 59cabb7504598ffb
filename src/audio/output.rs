//! Audio output: plays one WAV-encoded soundscape to completion.

use crate::error::Result;
use crate::signal::RunSignal;

/// Sink for per-frame soundscapes.
///
/// `play` returns once playback has finished, or early when `signal`
/// reports a stop request. Frame N's audio therefore always ends before
/// frame N+1 is captured.
pub trait AudioOutput {
    fn play(&mut self, wav: &[u8], signal: &RunSignal) -> Result<()>;
}

/// Discards audio (playback disabled)
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&mut self, _wav: &[u8], _signal: &RunSignal) -> Result<()> {
        Ok(())
    }
}

/// Linear-interpolation resample of interleaved audio
pub fn resample_linear(samples: &[f32], channels: usize, from_hz: u32, to_hz: u32) -> Vec<f32> {
    if from_hz == to_hz || channels == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let frames_in = samples.len() / channels;
    let frames_out = (frames_in as u64 * to_hz as u64 / from_hz as u64) as usize;
    let step = from_hz as f64 / to_hz as f64;

    let mut out = Vec::with_capacity(frames_out * channels);
    for i in 0..frames_out {
        let pos = i as f64 * step;
        let i0 = (pos as usize).min(frames_in - 1);
        let i1 = (i0 + 1).min(frames_in - 1);
        let frac = (pos - i0 as f64) as f32;
        for c in 0..channels {
            let a = samples[i0 * channels + c];
            let b = samples[i1 * channels + c];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

#[cfg(feature = "playback")]
pub use device::CpalOutput;

#[cfg(feature = "playback")]
mod device {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use crossbeam_channel::{bounded, select};
    use tracing::{debug, info, warn};

    use super::{resample_linear, AudioOutput};
    use crate::audio::wav;
    use crate::error::{Result, ThermalError};
    use crate::signal::RunSignal;

    /// Plays through the default output device
    #[derive(Debug)]
    pub struct CpalOutput {
        /// Extra wait beyond the clip length before giving up on the device
        grace: Duration,
    }

    impl CpalOutput {
        /// Probe the default output device
        pub fn new() -> Result<Self> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or_else(|| {
                ThermalError::collaborator("audio output", "no audio output device found")
            })?;
            let config = device
                .default_output_config()
                .map_err(|e| ThermalError::collaborator("audio output", e))?;

            info!(
                device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
                sample_rate = config.sample_rate().0,
                "Audio output ready"
            );

            Ok(Self {
                grace: Duration::from_secs(2),
            })
        }
    }

    impl AudioOutput for CpalOutput {
        fn play(&mut self, wav_bytes: &[u8], signal: &RunSignal) -> Result<()> {
            let (samples, channels, sample_rate) = wav::decode(wav_bytes)?;
            let channels = channels.max(1) as usize;

            let host = cpal::default_host();
            let device = host.default_output_device().ok_or_else(|| {
                ThermalError::collaborator("audio output", "no audio output device found")
            })?;
            let supported = device
                .default_output_config()
                .map_err(|e| ThermalError::collaborator("audio output", e))?;
            let device_rate = supported.sample_rate().0;
            let config: cpal::StreamConfig = supported.into();
            let device_channels = config.channels as usize;

            let samples = Arc::new(resample_linear(&samples, channels, sample_rate, device_rate));
            let total_frames = samples.len() / channels;
            let position = Arc::new(AtomicUsize::new(0));
            let (done_tx, done_rx) = bounded::<()>(1);

            let stream_samples = Arc::clone(&samples);
            let stream_position = Arc::clone(&position);

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut frame = stream_position.load(Ordering::Relaxed);
                        for out in data.chunks_mut(device_channels) {
                            if frame < total_frames {
                                for (c, slot) in out.iter_mut().enumerate() {
                                    // Mono sources feed every channel; extra device channels stay silent
                                    *slot = if channels == 1 {
                                        stream_samples[frame]
                                    } else if c < channels {
                                        stream_samples[frame * channels + c]
                                    } else {
                                        0.0
                                    };
                                }
                                frame += 1;
                            } else {
                                out.iter_mut().for_each(|s| *s = 0.0);
                            }
                        }
                        stream_position.store(frame, Ordering::Relaxed);
                        if frame >= total_frames {
                            let _ = done_tx.try_send(());
                        }
                    },
                    |err| warn!("Audio stream error: {}", err),
                    None,
                )
                .map_err(|e| ThermalError::collaborator("audio output", e))?;

            stream
                .play()
                .map_err(|e| ThermalError::collaborator("audio output", e))?;

            let clip = Duration::from_secs_f64(total_frames as f64 / device_rate.max(1) as f64);
            select! {
                recv(done_rx) -> _ => {
                    // Let the device drain its last buffer
                    std::thread::sleep(Duration::from_millis(50));
                }
                recv(signal.wake_receiver()) -> _ => {
                    debug!("Playback interrupted by stop request");
                }
                default(clip + self.grace) => {
                    return Err(ThermalError::collaborator(
                        "audio output",
                        "playback did not complete in time",
                    ));
                }
            }

            Ok(())
        }
    }
}
