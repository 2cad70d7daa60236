//! Background workers and their supervision.
//!
//! Both workers are plain named threads started once per run. The
//! orchestrator polls `is_running` before every dispatch and joins them with
//! a bounded grace period on shutdown; a worker that does not finish in time
//! is detached.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::{AudioBackend, PlaybackOutcome};
use crate::config::PlaybackConfig;
use crate::error::{log_playback_error, PlaybackError};
use crate::sensor::TimeSource;
use crate::signals::{ExitSignal, PlaybackSignals, PlaybackSlot};
use crate::telemetry::{run_telemetry_loop, ReadingMonitor};

pub const AUDIO_WORKER: &str = "audio-worker";
pub const TELEMETRY_WORKER: &str = "telemetry-worker";

/// Wait granularity of the audio worker while idle.
const REQUEST_POLL: Duration = Duration::from_millis(100);

pub struct WorkerHandle {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, PlaybackError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|err| PlaybackError::WorkerSpawn {
                worker: name.to_string(),
                reason: err.to_string(),
            })?;
        tracing::info!("[Workers] Started {}", name);
        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn ensure_alive(&self) -> Result<(), PlaybackError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(PlaybackError::WorkerFailure {
                worker: self.name.clone(),
            })
        }
    }

    /// Join within `grace`; returns false if the worker was left running.
    pub fn join_with_grace(mut self, grace: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!("[Workers] {} did not stop within {:?}", self.name, grace);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if handle.join().is_err() {
            tracing::warn!("[Workers] {} panicked", self.name);
        }
        tracing::info!("[Workers] Joined {}", self.name);
        true
    }
}

/// Everything the audio worker needs, moved into its thread.
pub struct AudioWorker {
    pub station: u8,
    pub playback: PlaybackConfig,
    pub slot: Arc<PlaybackSlot>,
    pub signals: PlaybackSignals,
    pub backend: Box<dyn AudioBackend>,
}

impl AudioWorker {
    /// Serve playback requests until exit is raised.
    ///
    /// Unmapped colors and playback failures are logged and the worker goes
    /// back to waiting. Only a broken request slot ends the loop early.
    pub fn run(mut self) -> Result<u64, PlaybackError> {
        let mut attempts = 0u64;
        tracing::info!("[AudioWorker] Started for station {}", self.station);
        while let Some(label) = self.slot.wait_take(&self.signals.exit, REQUEST_POLL)? {
            attempts += 1;
            let Some(entry) = self.playback.lookup(self.station, &label) else {
                log_playback_error(
                    &PlaybackError::UnmappedColor {
                        station: self.station,
                        label,
                    },
                    "AudioWorker::run",
                );
                continue;
            };
            let path = self.playback.resource_path(entry);
            tracing::info!("[AudioWorker] Playing {:?} for {}", path, label);
            match self.backend.play(&path, &self.signals) {
                Ok(PlaybackOutcome::Finished) => {
                    tracing::info!("[AudioWorker] Finished {:?}", path)
                }
                Ok(PlaybackOutcome::Stopped) => {
                    tracing::info!("[AudioWorker] Stopped {:?}", path)
                }
                Err(err) => log_playback_error(&err, "AudioWorker::run"),
            }
        }
        tracing::info!("[AudioWorker] Exiting after {} requests", attempts);
        Ok(attempts)
    }

    pub fn spawn(self) -> Result<WorkerHandle, PlaybackError> {
        WorkerHandle::spawn(AUDIO_WORKER, move || {
            if let Err(err) = self.run() {
                log_playback_error(&err, "AudioWorker");
            }
        })
    }
}

pub fn spawn_telemetry_worker(
    monitor: ReadingMonitor,
    interval: Duration,
    time: Arc<dyn TimeSource>,
    exit: ExitSignal,
) -> Result<WorkerHandle, PlaybackError> {
    WorkerHandle::spawn(TELEMETRY_WORKER, move || {
        run_telemetry_loop(&monitor, interval, time.as_ref(), &exit);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimulatedPlayer;
    use crate::config::PlaybackEntry;
    use crate::sensor::StubTimeSource;
    use std::path::Path;
    use std::sync::Mutex;

    /// Backend that records requested paths without touching the disk.
    struct PathRecorder(Arc<Mutex<Vec<String>>>);

    impl AudioBackend for PathRecorder {
        fn play(
            &mut self,
            path: &Path,
            _signals: &PlaybackSignals,
        ) -> Result<PlaybackOutcome, PlaybackError> {
            self.0.lock().unwrap().push(path.display().to_string());
            Ok(PlaybackOutcome::Finished)
        }
    }

    fn playback() -> PlaybackConfig {
        PlaybackConfig {
            resource_dir: "sounds".into(),
            map: vec![PlaybackEntry {
                station: 3,
                resource: "301_red".to_string(),
                label: "red".to_string(),
            }],
        }
    }

    #[test]
    fn test_worker_plays_mapped_and_skips_unmapped() {
        let exit = ExitSignal::new();
        let slot = Arc::new(PlaybackSlot::new());
        let played = Arc::new(Mutex::new(Vec::new()));
        let worker = AudioWorker {
            station: 3,
            playback: playback(),
            slot: Arc::clone(&slot),
            signals: PlaybackSignals::new(exit.clone()),
            backend: Box::new(PathRecorder(Arc::clone(&played))),
        };
        let handle = worker.spawn().unwrap();

        slot.offer("blue").unwrap();
        while slot.is_pending() {
            thread::sleep(Duration::from_millis(5));
        }
        slot.offer("red").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while played.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(handle.is_running());
        exit.raise();
        assert!(handle.join_with_grace(Duration::from_secs(3)));
        let played = played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert!(played[0].ends_with("301.wav"));
    }

    #[test]
    fn test_dead_worker_fails_liveness() {
        let handle = WorkerHandle::spawn("short-lived", || {}).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(
            handle.ensure_alive(),
            Err(PlaybackError::WorkerFailure {
                worker: "short-lived".to_string()
            })
        );
    }

    #[test]
    fn test_grace_period_detaches_stuck_worker() {
        let release = ExitSignal::new();
        let flag = release.clone();
        let handle = WorkerHandle::spawn("stuck", move || {
            while !flag.is_raised() {
                thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();
        assert!(!handle.join_with_grace(Duration::from_millis(50)));
        release.raise();
    }

    #[test]
    fn test_worker_exits_on_exit_signal() {
        let exit = ExitSignal::new();
        let worker = AudioWorker {
            station: 3,
            playback: playback(),
            slot: Arc::new(PlaybackSlot::new()),
            signals: PlaybackSignals::new(exit.clone()),
            backend: Box::new(SimulatedPlayer::new(Arc::new(StubTimeSource::new()))),
        };
        exit.raise();
        assert_eq!(worker.run(), Ok(0));
    }
}
