//! Error types and handling
//!
//! Common error types used across the application.

use crate::capture::DeviceError;
use crate::encode::EncodeError;
use crate::recorder::channel::RecordingError;
use thiserror::Error;

/// Exit code for a successful run
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for any failure
pub const EXIT_FAILURE: u8 = 1;

/// Exit code when the user cancels before recording starts (128 + SIGINT)
pub const EXIT_CANCELLED: u8 = 130;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

impl AppError {
    /// Short machine-readable code, used in verbose diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::Device(_) => "DEVICE_ERROR",
            AppError::Encode(_) => "ENCODE_ERROR",
            AppError::Recording(_) => "RECORDING_ERROR",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
