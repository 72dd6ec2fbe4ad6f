//! In-memory recording channel for tests

use super::channel::{RecordingChannel, RecordingError, RecordingResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes a small file per session instead of capturing anything
pub struct FakeChannel {
    dir: Option<PathBuf>,
    session: usize,
    recording: bool,
    files: Vec<PathBuf>,
    log: Arc<Mutex<Vec<String>>>,
    /// Report a dead capture on the next health check
    pub fail_health: bool,
    /// Write the segment but report an error on stop
    pub fail_stop: bool,
}

impl FakeChannel {
    pub fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            dir: None,
            session: 0,
            recording: false,
            files: Vec::new(),
            log,
            fail_health: false,
            fail_stop: false,
        }
    }

    fn close_segment(&mut self) -> RecordingResult<()> {
        let dir = self.dir.clone().ok_or(RecordingError::NotRecording)?;
        let path = dir.join(format!("segment-{}.mov", self.session));
        std::fs::write(&path, format!("session {}", self.session))?;
        self.files.push(path);
        self.recording = false;
        Ok(())
    }
}

#[async_trait]
impl RecordingChannel for FakeChannel {
    fn id(&self) -> &str {
        "fake"
    }

    async fn initialize(&mut self, output_dir: &Path, session_index: usize) -> RecordingResult<()> {
        self.dir = Some(output_dir.to_path_buf());
        self.session = session_index;
        self.log.lock().push("initialize".to_string());
        Ok(())
    }

    async fn start(&mut self) -> RecordingResult<()> {
        self.recording = true;
        self.log.lock().push(format!("start {}", self.session));
        Ok(())
    }

    async fn stop(&mut self) -> RecordingResult<()> {
        self.log.lock().push("stop".to_string());
        self.close_segment()?;
        if self.fail_stop {
            return Err(RecordingError::CaptureFailed("encoder did not exit cleanly".to_string()));
        }
        Ok(())
    }

    async fn pause(&mut self) -> RecordingResult<()> {
        self.log.lock().push("pause".to_string());
        self.close_segment()
    }

    async fn resume(&mut self, session_index: usize) -> RecordingResult<()> {
        self.session = session_index;
        self.start().await
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn output_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn check_health(&mut self) -> RecordingResult<()> {
        if self.fail_health && self.recording {
            self.close_segment()?;
            return Err(RecordingError::CaptureFailed("device unplugged".to_string()));
        }
        Ok(())
    }
}
