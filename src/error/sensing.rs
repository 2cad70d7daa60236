// Sensing error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sensing error code constants
///
/// Error code range: 3001-3004
pub struct SensingErrorCodes;

impl SensingErrorCodes {
    /// Argument rejected before any sampling started
    pub const INVALID_ARGUMENT: i32 = 3001;

    /// Live station pattern matches no configured pattern
    pub const UNDEFINED_STATION: i32 = 3002;

    /// Polling loop left because the exit signal was raised
    pub const CANCELLED: i32 = 3003;

    /// Shared sensor state lock was poisoned
    pub const LOCK_POISONED: i32 = 3004;
}

/// Log a sensing error with structured context
pub fn log_sensing_error(err: &SensingError, context: &str) {
    error!(
        "Sensing error in {}: code={}, component=SensingPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Sensing-related errors
///
/// Transient sensor noise never shows up here; it is absorbed by the retry
/// loop of the stable sampler.
#[derive(Debug, Clone, PartialEq)]
pub enum SensingError {
    /// Argument out of its valid range (e.g. stable count below 2)
    InvalidArgument { name: String, reason: String },

    /// No configured station pattern equals the live pattern
    UndefinedStation { pattern: Vec<u8> },

    /// The exit signal was observed while waiting for the sensor
    Cancelled,

    /// A shared sensor resource lock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for SensingError {
    fn code(&self) -> i32 {
        match self {
            SensingError::InvalidArgument { .. } => SensingErrorCodes::INVALID_ARGUMENT,
            SensingError::UndefinedStation { .. } => SensingErrorCodes::UNDEFINED_STATION,
            SensingError::Cancelled => SensingErrorCodes::CANCELLED,
            SensingError::LockPoisoned { .. } => SensingErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            SensingError::InvalidArgument { name, reason } => {
                format!("Invalid argument {}: {}", name, reason)
            }
            SensingError::UndefinedStation { pattern } => {
                format!("Station {:?} not defined", pattern)
            }
            SensingError::Cancelled => "Sensing cancelled by exit signal".to_string(),
            SensingError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
        }
    }
}

impl fmt::Display for SensingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SensingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SensingError {}
