//! Simulated audio backend for desktop runs and tests
//!
//! Behaves like a real backend from the worker's point of view: it validates
//! the resource, blocks for the clip duration in PLAYBACK_POLL_INTERVAL ticks
//! and honours the stop and exit signals between ticks. Nothing is sent to
//! an output device. Every attempt is recorded so tests can inspect it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{wav, AudioBackend, PlaybackOutcome, PLAYBACK_POLL_INTERVAL};
use crate::error::PlaybackError;
use crate::sensor::TimeSource;
use crate::signals::PlaybackSignals;

/// One completed playback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub path: PathBuf,
    pub outcome: PlaybackOutcome,
}

/// Stub audio backend
///
/// Clones share the play log, so a test can keep one clone while the audio
/// worker owns another.
#[derive(Clone)]
pub struct SimulatedPlayer {
    time: Arc<dyn TimeSource>,
    /// Fixed clip length; `None` decodes the WAV file to find its length
    fixed_duration: Option<Duration>,
    log: Arc<Mutex<Vec<PlayRecord>>>,
}

impl SimulatedPlayer {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            time,
            fixed_duration: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Treat every resource as a clip of `duration`, skipping decoding.
    pub fn with_fixed_duration(mut self, duration: Duration) -> Self {
        self.fixed_duration = Some(duration);
        self
    }

    pub fn played(&self) -> Vec<PlayRecord> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn clip_duration(&self, path: &Path) -> Result<Duration, PlaybackError> {
        match self.fixed_duration {
            Some(duration) => {
                if !path.is_file() {
                    return Err(PlaybackError::MissingResource {
                        path: path.display().to_string(),
                    });
                }
                Ok(duration)
            }
            None => wav::validate(path),
        }
    }
}

impl AudioBackend for SimulatedPlayer {
    fn play(
        &mut self,
        path: &Path,
        signals: &PlaybackSignals,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let duration = self.clip_duration(path)?;
        tracing::info!("[SimulatedPlayer] Playing {:?} ({:?})", path, duration);

        let mut remaining = duration;
        let outcome = loop {
            if signals.should_halt() {
                break PlaybackOutcome::Stopped;
            }
            if remaining.is_zero() {
                break PlaybackOutcome::Finished;
            }
            let tick = remaining.min(PLAYBACK_POLL_INTERVAL);
            self.time.sleep(tick);
            remaining -= tick;
        };

        let record = PlayRecord {
            path: path.to_path_buf(),
            outcome,
        };
        self.log
            .lock()
            .map_err(|_| PlaybackError::LockPoisoned {
                component: "SimulatedPlayer".to_string(),
            })?
            .push(record);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::StubTimeSource;
    use crate::signals::ExitSignal;

    fn temp_clip(name: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("ledsense_stub_{}_{}", std::process::id(), name));
        wav::write_tone(&path, 440.0, Duration::from_millis(450), 8_000).unwrap();
        path
    }

    #[test]
    fn test_plays_decoded_duration() {
        let path = temp_clip("full.wav");
        let time = Arc::new(StubTimeSource::new());
        let mut player = SimulatedPlayer::new(time.clone());

        let outcome = player
            .play(&path, &PlaybackSignals::new(ExitSignal::new()))
            .unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
        assert_eq!(time.elapsed(), Duration::from_millis(450));
        assert_eq!(player.played().len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_stop_signal_halts_playback() {
        let path = temp_clip("stopped.wav");
        let mut player = SimulatedPlayer::new(Arc::new(StubTimeSource::new()));
        let signals = PlaybackSignals::new(ExitSignal::new());
        signals.stop.set();

        assert_eq!(player.play(&path, &signals).unwrap(), PlaybackOutcome::Stopped);
        assert_eq!(player.played()[0].outcome, PlaybackOutcome::Stopped);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_resource_fails() {
        let mut player = SimulatedPlayer::new(Arc::new(StubTimeSource::new()))
            .with_fixed_duration(Duration::from_secs(1));
        let err = player
            .play(
                Path::new("/nonexistent/ledsense.wav"),
                &PlaybackSignals::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PlaybackError::MissingResource { .. }));
        assert!(player.played().is_empty());
    }
}
