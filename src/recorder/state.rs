//! Recording state management
//!
//! Defines the recording state machine and session tracking.

use crate::encode::EncodingPreset;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Movie file written, about to return to idle
    Complete,
}

impl RecordingState {
    /// Recording or paused
    pub fn is_active(&self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Paused)
    }
}

/// One uninterrupted stretch of recording
///
/// A new session is created each time recording is resumed after a pause.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Session index (0, 1, 2, ...)
    pub index: usize,

    /// Duration of this session in milliseconds, set when it ends
    pub duration_ms: f64,

    /// Milliseconds since the recording started when this session began
    pub offset_start_ms: f64,

    /// Milliseconds since the recording started when this session ended
    pub offset_end_ms: f64,

    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(index: usize, offset_ms: f64) -> Self {
        Self {
            index,
            duration_ms: 0.0,
            offset_start_ms: offset_ms,
            offset_end_ms: offset_ms,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// End the session
    pub fn end(&mut self, offset_ms: f64) {
        self.offset_end_ms = offset_ms;
        self.duration_ms = (self.offset_end_ms - self.offset_start_ms).max(0.0);
        self.ended_at = Some(Utc::now());
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Everything needed to run one recording
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Final movie file
    pub output_path: PathBuf,

    /// Name of the capture device
    pub device_name: String,

    /// Name of the audio device, None when recording without audio
    pub audio_device_name: Option<String>,

    pub preset: EncodingPreset,

    /// Stop automatically after this much recorded time
    pub max_duration_secs: Option<f64>,

    /// Wait before capturing starts
    pub delay_secs: f64,
}

/// Result of a completed recording
#[derive(Debug, Clone)]
pub struct RecordingOutput {
    /// Path of the finished movie file
    pub output_path: PathBuf,

    /// Recorded time in milliseconds, pauses excluded
    pub total_duration_ms: f64,

    /// Number of sessions (pause/resume cycles + 1)
    pub session_count: usize,

    /// Number of segment files joined into the movie
    pub segment_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_duration() {
        let mut session = RecordingSession::new(1, 1500.0);
        assert!(session.is_open());
        session.end(4000.0);
        assert_eq!(session.duration_ms, 2500.0);
        assert!(!session.is_open());
    }

    #[test]
    fn test_active_states() {
        assert!(!RecordingState::Idle.is_active());
        assert!(RecordingState::Recording.is_active());
        assert!(RecordingState::Paused.is_active());
        assert!(!RecordingState::Complete.is_active());
    }
}
