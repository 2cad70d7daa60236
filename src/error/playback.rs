// Playback error types and constants

use crate::error::{ErrorCode, SensingError};
use log::error;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 1001-1008
pub struct PlaybackErrorCodes;

impl PlaybackErrorCodes {
    /// Required audio resource does not exist
    pub const MISSING_RESOURCE: i32 = 1001;

    /// Audio resource exists but fails structural validation
    pub const CORRUPT_RESOURCE: i32 = 1002;

    /// No mapping entry for (station, label)
    pub const UNMAPPED_COLOR: i32 = 1003;

    /// A background worker terminated unexpectedly
    pub const WORKER_FAILURE: i32 = 1004;

    /// Output device or stream could not be opened
    pub const STREAM_OPEN_FAILED: i32 = 1005;

    /// Worker thread could not be spawned
    pub const WORKER_SPAWN: i32 = 1006;

    /// Shared playback state lock was poisoned
    pub const LOCK_POISONED: i32 = 1007;

    /// Sensing pipeline failed underneath the orchestrator
    pub const SENSING: i32 = 1008;
}

/// Log a playback error with structured context
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackOrchestrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Playback-related errors
///
/// `MissingResource` and `WorkerFailure` are fatal for a run,
/// `CorruptResource` and `UnmappedColor` are reported and survived.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Audio file not found on disk
    MissingResource { path: String },

    /// Audio file present but not decodable
    CorruptResource { path: String, reason: String },

    /// No resource configured for this station and color label
    UnmappedColor { station: u8, label: String },

    /// Background worker is no longer running
    WorkerFailure { worker: String },

    /// Failed to open audio output
    StreamOpenFailed { reason: String },

    /// Failed to start a worker thread
    WorkerSpawn { worker: String, reason: String },

    /// Mutex/Condvar state was poisoned
    LockPoisoned { component: String },

    /// Station resolution or sampling failed
    Sensing(SensingError),
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::MissingResource { .. } => PlaybackErrorCodes::MISSING_RESOURCE,
            PlaybackError::CorruptResource { .. } => PlaybackErrorCodes::CORRUPT_RESOURCE,
            PlaybackError::UnmappedColor { .. } => PlaybackErrorCodes::UNMAPPED_COLOR,
            PlaybackError::WorkerFailure { .. } => PlaybackErrorCodes::WORKER_FAILURE,
            PlaybackError::StreamOpenFailed { .. } => PlaybackErrorCodes::STREAM_OPEN_FAILED,
            PlaybackError::WorkerSpawn { .. } => PlaybackErrorCodes::WORKER_SPAWN,
            PlaybackError::LockPoisoned { .. } => PlaybackErrorCodes::LOCK_POISONED,
            PlaybackError::Sensing(_) => PlaybackErrorCodes::SENSING,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::MissingResource { path } => {
                format!("File {} does not exist", path)
            }
            PlaybackError::CorruptResource { path, reason } => {
                format!("File {} is not a valid audio file: {}", path, reason)
            }
            PlaybackError::UnmappedColor { station, label } => {
                format!("No audio resource mapped for station {} and color {}", station, label)
            }
            PlaybackError::WorkerFailure { worker } => {
                format!("Thread {} unexpectedly died", worker)
            }
            PlaybackError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            PlaybackError::WorkerSpawn { worker, reason } => {
                format!("Failed to spawn worker {}: {}", worker, reason)
            }
            PlaybackError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            PlaybackError::Sensing(err) => format!("Sensing failed: {}", err.message()),
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}

impl From<SensingError> for PlaybackError {
    fn from(err: SensingError) -> Self {
        PlaybackError::Sensing(err)
    }
}

/// Convert from std::io::Error when a worker thread cannot be spawned
impl From<std::io::Error> for PlaybackError {
    fn from(err: std::io::Error) -> Self {
        PlaybackError::WorkerSpawn {
            worker: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_codes() {
        assert_eq!(
            PlaybackError::MissingResource {
                path: "x".to_string()
            }
            .code(),
            PlaybackErrorCodes::MISSING_RESOURCE
        );
        assert_eq!(
            PlaybackError::CorruptResource {
                path: "x".to_string(),
                reason: "y".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            PlaybackError::UnmappedColor {
                station: 1,
                label: "red".to_string()
            }
            .code(),
            1003
        );
        assert_eq!(
            PlaybackError::WorkerFailure {
                worker: "audio".to_string()
            }
            .code(),
            1004
        );
        assert_eq!(
            PlaybackError::LockPoisoned {
                component: "slot".to_string()
            }
            .code(),
            1007
        );
    }

    #[test]
    fn test_worker_failure_names_worker() {
        let err = PlaybackError::WorkerFailure {
            worker: "audio-worker".to_string(),
        };
        assert!(err.message().contains("audio-worker"));
        assert!(err.to_string().starts_with("PlaybackError::WorkerFailure"));
    }

    #[test]
    fn test_sensing_error_wraps() {
        let err: PlaybackError = SensingError::UndefinedStation {
            pattern: vec![0, 0, 1],
        }
        .into();
        assert_eq!(err.code(), 1008);
        assert!(err.message().contains("[0, 0, 1]"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err: PlaybackError = io_err.into();
        match err {
            PlaybackError::WorkerSpawn { reason, .. } => assert!(reason.contains("no threads")),
            other => panic!("Expected WorkerSpawn, got {:?}", other),
        }
    }
}
