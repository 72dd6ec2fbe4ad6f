//! Encoding: presets and the ffmpeg command line
//!
//! - `preset` maps preset names to encoder settings
//! - `ffmpeg` builds capture commands, joins segments and probes output

pub mod ffmpeg;
pub mod preset;

pub use ffmpeg::{CaptureInput, FfmpegCommandBuilder, MediaInfo};
pub use preset::EncodingPreset;

use thiserror::Error;

/// Encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("FFmpeg not found: {0}")]
    NotFound(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Invalid encoding preset {0}")]
    InvalidPreset(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
