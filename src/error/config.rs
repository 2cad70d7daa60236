// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 4001-4004
pub struct ConfigErrorCodes;

impl ConfigErrorCodes {
    /// Configuration file could not be read or written
    pub const IO: i32 = 4001;

    /// Configuration file is not valid JSON for the schema
    pub const PARSE: i32 = 4002;

    /// Configuration violates an invariant
    pub const INVALID: i32 = 4003;

    /// Color table and playback map disagree (advisory)
    pub const CONFIGURATION_MISMATCH: i32 = 4004;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=Config, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File system failure
    Io { path: String, details: String },

    /// Malformed document
    Parse { path: String, details: String },

    /// Well-formed but semantically invalid
    Invalid { reason: String },

    /// Advisory mismatch between color table and playback map
    ConfigurationMismatch { detail: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
            ConfigError::Invalid { .. } => ConfigErrorCodes::INVALID,
            ConfigError::ConfigurationMismatch { .. } => ConfigErrorCodes::CONFIGURATION_MISMATCH,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Io { path, details } => {
                format!("Failed to access config file {}: {}", path, details)
            }
            ConfigError::Parse { path, details } => {
                format!("Failed to parse config file {}: {}", path, details)
            }
            ConfigError::Invalid { reason } => format!("Invalid configuration: {}", reason),
            ConfigError::ConfigurationMismatch { detail } => {
                format!("Configuration mismatch: {}", detail)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
