// Calibration error types and constants

use crate::error::{ErrorCode, SensingError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2006
pub struct CalibrationErrorCodes;

impl CalibrationErrorCodes {
    /// A label has no accepted samples
    pub const INSUFFICIENT_SAMPLES: i32 = 2001;

    /// Calibration artifacts disagree on their label set
    pub const INCOMPATIBLE_ARTIFACT: i32 = 2002;

    /// Calibration analysis started without any artifact
    pub const NO_ARTIFACTS: i32 = 2003;

    /// Reading or writing an artifact failed
    pub const IO: i32 = 2004;

    /// Artifact could not be (de)serialized
    pub const SERIALIZATION: i32 = 2005;

    /// Sensing pipeline failed during a session
    pub const SENSING: i32 = 2006;
}

/// Log a calibration error with structured context
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Not enough samples were collected for a label
    InsufficientSamples {
        label: String,
        required: usize,
        collected: usize,
    },

    /// An artifact's label list differs from the reference artifact
    IncompatibleArtifact { file: String, reason: String },

    /// Nothing to analyse
    NoArtifacts,

    /// File system failure
    Io { path: String, details: String },

    /// JSON encoding/decoding failure
    Serialization { path: String, details: String },

    /// Station resolution or sampling failed
    Sensing(SensingError),
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::IncompatibleArtifact { .. } => {
                CalibrationErrorCodes::INCOMPATIBLE_ARTIFACT
            }
            CalibrationError::NoArtifacts => CalibrationErrorCodes::NO_ARTIFACTS,
            CalibrationError::Io { .. } => CalibrationErrorCodes::IO,
            CalibrationError::Serialization { .. } => CalibrationErrorCodes::SERIALIZATION,
            CalibrationError::Sensing(_) => CalibrationErrorCodes::SENSING,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientSamples {
                label,
                required,
                collected,
            } => {
                format!(
                    "Insufficient samples for {}: need {}, got {}",
                    label, required, collected
                )
            }
            CalibrationError::IncompatibleArtifact { file, reason } => {
                format!("Calibration file {} is incompatible: {}", file, reason)
            }
            CalibrationError::NoArtifacts => "No calibration files given".to_string(),
            CalibrationError::Io { path, details } => {
                format!("I/O error on {}: {}", path, details)
            }
            CalibrationError::Serialization { path, details } => {
                format!("Invalid calibration document {}: {}", path, details)
            }
            CalibrationError::Sensing(inner) => {
                format!("Sensing failed: {}", inner.message())
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

impl From<SensingError> for CalibrationError {
    fn from(err: SensingError) -> Self {
        CalibrationError::Sensing(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::InsufficientSamples {
                label: "red".to_string(),
                required: 5,
                collected: 0
            }
            .code(),
            CalibrationErrorCodes::INSUFFICIENT_SAMPLES
        );
        assert_eq!(
            CalibrationError::IncompatibleArtifact {
                file: "a.json".to_string(),
                reason: "x".to_string()
            }
            .code(),
            2002
        );
        assert_eq!(CalibrationError::NoArtifacts.code(), 2003);
        assert_eq!(
            CalibrationError::Sensing(SensingError::Cancelled).code(),
            CalibrationErrorCodes::SENSING
        );
    }

    #[test]
    fn test_incompatible_artifact_names_file() {
        let err = CalibrationError::IncompatibleArtifact {
            file: "station_2.json".to_string(),
            reason: "color count differs (3 vs 4)".to_string(),
        };
        assert!(err.message().contains("station_2.json"));
        assert!(err.message().contains("3 vs 4"));
    }

    #[test]
    fn test_sensing_error_conversion() {
        let err: CalibrationError = SensingError::UndefinedStation {
            pattern: vec![0, 0, 0],
        }
        .into();
        assert!(err.message().contains("not defined"));
    }
}
