// Error types for the color sensing kiosk
//
// One enum per subsystem (sensing, playback, calibration, configuration), each
// carrying a stable numeric code so log lines and exit diagnostics can name the
// failing subsystem.

mod calibration;
mod config;
mod playback;
mod sensing;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};
pub use sensing::{log_sensing_error, SensingError, SensingErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait_objects() {
        let errors: Vec<Box<dyn ErrorCode>> = vec![
            Box::new(PlaybackError::MissingResource {
                path: "a.wav".to_string(),
            }),
            Box::new(CalibrationError::NoArtifacts),
            Box::new(SensingError::Cancelled),
            Box::new(ConfigError::Invalid {
                reason: "x".to_string(),
            }),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec![1001, 2003, 3003, 4003]);
    }
}
