//! Recording channel abstraction
//!
//! A channel is one capture pipeline (device in, segment files out) that the
//! coordinator starts, pauses and stops. Each pause/resume cycle produces a
//! new segment.

use crate::encode::EncodeError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Recording errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// The movie file was written, but capture ended with an error
    #[error("Movie file written to {output_path:?}, but capture failed: {source}")]
    Incomplete {
        output_path: PathBuf,
        source: Box<RecordingError>,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RecordingResult<T> = Result<T, RecordingError>;

/// A capture pipeline driven by the coordinator
#[async_trait]
pub trait RecordingChannel: Send {
    /// Channel identifier, for logs
    fn id(&self) -> &str;

    /// Prepare to write segments into `output_dir`, starting at `session_index`
    async fn initialize(&mut self, output_dir: &Path, session_index: usize) -> RecordingResult<()>;

    /// Begin capturing into the current session's segment
    async fn start(&mut self) -> RecordingResult<()>;

    /// Stop capturing and close the current segment
    async fn stop(&mut self) -> RecordingResult<()>;

    /// Close the current segment, keeping the channel ready to resume
    async fn pause(&mut self) -> RecordingResult<()>;

    /// Open a new segment for `session_index`
    async fn resume(&mut self, session_index: usize) -> RecordingResult<()>;

    fn is_recording(&self) -> bool;

    /// Completed segment files, in session order
    fn output_files(&self) -> Vec<PathBuf>;

    /// Report a capture that died on its own (device unplugged, encoder crash)
    fn check_health(&mut self) -> RecordingResult<()>;
}
