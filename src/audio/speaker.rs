//! Output to the default audio device via cpal.
//!
//! The decoded clip is copied into the output callback frame by frame; the
//! calling thread keeps ownership of the stream and drops it as soon as the
//! clip ends or a halt is requested.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{wav, AudioBackend, PlaybackOutcome, PLAYBACK_POLL_INTERVAL};
use crate::error::PlaybackError;
use crate::signals::PlaybackSignals;

#[derive(Debug, Default)]
pub struct SpeakerBackend {
    _unit: (),
}

impl SpeakerBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_stream(
        &self,
        clip: wav::Clip,
        position: Arc<AtomicUsize>,
    ) -> Result<cpal::Stream, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| PlaybackError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels_count = stream_config.channels as usize;
        // source frames advanced per output frame
        let step = clip.sample_rate as f64 / stream_config.sample_rate.0 as f64;
        let samples = Arc::new(clip.samples);

        let err_fn = |err| tracing::error!("[Speaker] Output stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frame_count = data.len() / channels_count;
                    let start = position.load(Ordering::Relaxed);
                    for i in 0..frame_count {
                        let src = ((start + i) as f64 * step) as usize;
                        let value = samples.get(src).copied().unwrap_or(0.0);
                        for ch in 0..channels_count {
                            data[i * channels_count + ch] = value;
                        }
                    }
                    position.fetch_add(frame_count, Ordering::Relaxed);
                },
                err_fn,
                None,
            ),
            _ => {
                return Err(PlaybackError::StreamOpenFailed {
                    reason: "Only F32 sample format is currently supported for output".to_string(),
                })
            }
        }
        .map_err(|e| PlaybackError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok(stream)
    }
}

impl AudioBackend for SpeakerBackend {
    fn play(
        &mut self,
        path: &Path,
        signals: &PlaybackSignals,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let clip = wav::decode(path)?;
        let total_source = clip.samples.len();
        let source_rate = clip.sample_rate.max(1) as f64;
        let position = Arc::new(AtomicUsize::new(0));

        let stream = self.open_stream(clip, Arc::clone(&position))?;
        stream.play().map_err(|e| PlaybackError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;
        tracing::info!("[Speaker] Playing {:?}", path);

        let total_secs = total_source as f64 / source_rate;
        let started = std::time::Instant::now();
        let outcome = loop {
            if signals.should_halt() {
                break PlaybackOutcome::Stopped;
            }
            if started.elapsed().as_secs_f64() >= total_secs {
                break PlaybackOutcome::Finished;
            }
            std::thread::sleep(PLAYBACK_POLL_INTERVAL);
        };
        drop(stream);
        Ok(outcome)
    }
}
