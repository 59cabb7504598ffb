//! WAV encoding of soundscapes (stereo, 32-bit float).

use std::io::Cursor;

use super::composer::Soundscape;
use crate::error::{Result, ThermalError};

fn wav_spec(sample_rate_hz: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate_hz,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Encode a soundscape as an in-memory WAV file
pub fn encode(soundscape: &Soundscape) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(soundscape.sample_rate_hz()))?;
        for frame in soundscape.frames() {
            writer.write_sample(frame[0])?;
            writer.write_sample(frame[1])?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV file into interleaved f32 samples, channel count and sample rate
pub fn decode(bytes: &[u8]) -> Result<(Vec<f32>, u16, u32)> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(ThermalError::InvalidAudioData(format!(
                    "unsupported bit depth {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_and_length() {
        let soundscape = Soundscape::new(vec![[0.5, -0.5]; 100], 44100);
        let bytes = encode(&soundscape).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(&bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.duration(), 100);
    }

    #[test]
    fn test_decode_preserves_channel_order() {
        let soundscape = Soundscape::new(vec![[0.25, -0.75], [0.0, 1.0]], 8000);
        let (samples, channels, rate) = decode(&encode(&soundscape).unwrap()).unwrap();
        assert_eq!(channels, 2);
        assert_eq!(rate, 8000);
        assert_eq!(samples, vec![0.25, -0.75, 0.0, 1.0]);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"not a wav file").is_err());
    }
}
