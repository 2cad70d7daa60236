//! WAV resources: structural validation at startup and decoding for playback.

use std::path::Path;
use std::time::Duration;

use crate::error::PlaybackError;

/// Decoded clip, downmixed to mono.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Clip {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Check that `path` parses as WAV and every sample decodes.
///
/// A missing file is reported as `MissingResource`, anything else that goes
/// wrong as `CorruptResource`.
pub fn validate(path: &Path) -> Result<Duration, PlaybackError> {
    decode(path).map(|clip| clip.duration())
}

pub fn decode(path: &Path) -> Result<Clip, PlaybackError> {
    if !path.is_file() {
        return Err(PlaybackError::MissingResource {
            path: path.display().to_string(),
        });
    }

    let corrupt = |reason: String| PlaybackError::CorruptResource {
        path: path.display().to_string(),
        reason,
    };

    let mut reader =
        hound::WavReader::open(path).map_err(|err| corrupt(format!("failed to open: {err}")))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(corrupt("zero channels".to_string()));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| corrupt(format!("error reading: {err}"))))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / i8::MAX as f32)
                        .map_err(|err| corrupt(format!("error reading: {err}")))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            16 => reader
                .samples::<i16>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / i16::MAX as f32)
                        .map_err(|err| corrupt(format!("error reading: {err}")))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            24 | 32 => {
                let scale = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|v| v as f32 / scale)
                            .map_err(|err| corrupt(format!("error reading: {err}")))
                    })
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => return Err(corrupt(format!("unsupported bits_per_sample={bits}"))),
        },
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        samples
    } else {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().copied().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(Clip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Write a mono 16-bit sine clip; used to provision demo and test resources.
pub fn write_tone(
    path: &Path,
    frequency: f32,
    duration: Duration,
    sample_rate: u32,
) -> Result<(), PlaybackError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let io_error = |err: hound::Error| PlaybackError::CorruptResource {
        path: path.display().to_string(),
        reason: format!("failed to write: {err}"),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(io_error)?;
    let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (t * frequency * std::f32::consts::TAU).sin() * 0.5;
        writer
            .write_sample((value * i16::MAX as f32) as i16)
            .map_err(io_error)?;
    }
    writer.finalize().map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ledsense_wav_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_tone_roundtrip_duration() {
        let path = temp_path("tone.wav");
        write_tone(&path, 440.0, Duration::from_millis(250), 8_000).unwrap();

        let clip = decode(&path).unwrap();
        assert_eq!(clip.sample_rate, 8_000);
        assert_eq!(clip.samples.len(), 2_000);
        assert_eq!(validate(&path).unwrap(), Duration::from_millis(250));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let err = validate(&temp_path("absent.wav")).unwrap_err();
        assert!(matches!(err, PlaybackError::MissingResource { .. }));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let path = temp_path("garbage.wav");
        std::fs::write(&path, b"this is not a riff header").unwrap();
        let err = validate(&path).unwrap_err();
        assert!(matches!(err, PlaybackError::CorruptResource { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
