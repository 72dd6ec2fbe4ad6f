//! Recording coordinator
//!
//! Owns the capture session: drives the channel through start, pause,
//! resume and stop, tracks recorded time across sessions and writes the
//! final movie file.

use super::channel::{RecordingChannel, RecordingError, RecordingResult};
use super::state::{RecordingConfig, RecordingOutput, RecordingSession, RecordingState};
use crate::encode::ffmpeg::concat_segments;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording started
    Started { output_path: PathBuf },
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Movie file output finished, successfully or not
    Finished {
        output_path: PathBuf,
        error: Option<String>,
    },
}

/// Coordinates one capture channel and the movie file it feeds
pub struct RecordingCoordinator {
    /// Current recording state
    state: Arc<RwLock<RecordingState>>,

    /// Capture channel
    channel: Option<Box<dyn RecordingChannel>>,

    /// Recording sessions (one per pause/resume cycle)
    sessions: Vec<RecordingSession>,

    /// Current session index
    current_session: usize,

    /// Segment staging directory, next to the output file
    staging_dir: Option<TempDir>,

    /// Final movie path for the current recording
    output_path: Option<PathBuf>,

    /// ffmpeg binary, used to join segments
    ffmpeg: String,

    /// Time when recording started
    start_time: Option<Instant>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            channel: None,
            sessions: Vec::new(),
            current_session: 0,
            staging_dir: None,
            output_path: None,
            ffmpeg: ffmpeg.into(),
            start_time: None,
            event_tx,
        }
    }

    /// Set the capture channel
    pub fn set_channel(&mut self, channel: Box<dyn RecordingChannel>) {
        tracing::info!("Using channel: {}", channel.id());
        self.channel = Some(channel);
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Recording or paused
    pub fn is_recording(&self) -> bool {
        self.state().is_active()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Milliseconds since the recording started
    fn elapsed_ms(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    fn channel_mut(&mut self) -> RecordingResult<&mut Box<dyn RecordingChannel>> {
        self.channel
            .as_mut()
            .ok_or_else(|| RecordingError::ConfigurationError("No capture channel configured".to_string()))
    }

    /// Start recording
    pub async fn start(&mut self, config: &RecordingConfig) -> RecordingResult<()> {
        if self.state() != RecordingState::Idle {
            return Err(RecordingError::AlreadyRecording);
        }
        if self.channel.is_none() {
            return Err(RecordingError::ConfigurationError(
                "No capture channel configured".to_string(),
            ));
        }

        tracing::info!(
            "Starting recording of {} (audio: {}) to: {:?}",
            config.device_name,
            config.audio_device_name.as_deref().unwrap_or("none"),
            config.output_path
        );

        let parent = match config.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        // Staging on the same filesystem lets the final move be a rename
        let staging_dir = tempfile::Builder::new()
            .prefix(".videosnap-")
            .tempdir_in(&parent)?;
        let staging_path = staging_dir.path().to_path_buf();

        self.current_session = 0;
        self.sessions.clear();

        let channel = self.channel_mut()?;
        channel.initialize(&staging_path, 0).await?;
        channel.start().await?;

        // The clock starts once the device is delivering frames
        self.start_time = Some(Instant::now());
        self.sessions.push(RecordingSession::new(0, 0.0));
        self.staging_dir = Some(staging_dir);
        self.output_path = Some(config.output_path.clone());

        *self.state.write() = RecordingState::Recording;
        let _ = self.event_tx.send(RecordingEvent::Started {
            output_path: config.output_path.clone(),
        });

        tracing::info!("Recording started");
        Ok(())
    }

    /// Stop recording and write the movie file
    pub async fn stop(&mut self) -> RecordingResult<RecordingOutput> {
        let current_state = self.state();
        if !current_state.is_active() {
            return Err(RecordingError::NotRecording);
        }

        tracing::info!("Stopping recording");

        let end_time = self.elapsed_ms();
        if let Some(session) = self.sessions.last_mut() {
            if session.is_open() {
                session.end(end_time);
            }
        }

        // A paused (or failed) channel has already closed its segment
        let mut stop_error = None;
        let channel = self.channel_mut()?;
        if channel.is_recording() {
            if let Err(e) = channel.stop().await {
                tracing::error!("Failed to stop channel: {}", e);
                stop_error = Some(e);
            }
        }
        let segments = channel.output_files();

        let output_path = self.output_path.take().unwrap_or_default();
        let staging_dir = self.staging_dir.take();
        let result = self
            .finalize(&segments, &output_path, staging_dir, stop_error)
            .await;

        let total_duration_ms = self.duration_ms();
        let session_count = self.sessions.len();

        *self.state.write() = RecordingState::Complete;
        let _ = self.event_tx.send(RecordingEvent::Finished {
            output_path: output_path.clone(),
            error: result.as_ref().err().map(|e| e.to_string()),
        });

        self.start_time = None;
        *self.state.write() = RecordingState::Idle;

        result?;
        tracing::info!("Recording stopped. Duration: {:.0}ms", total_duration_ms);

        Ok(RecordingOutput {
            output_path,
            total_duration_ms,
            session_count,
            segment_count: segments.len(),
        })
    }

    /// Join segments into the output file, keeping them if that fails
    async fn finalize(
        &self,
        segments: &[PathBuf],
        output_path: &Path,
        staging_dir: Option<TempDir>,
        stop_error: Option<RecordingError>,
    ) -> RecordingResult<()> {
        let work_dir = staging_dir
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .unwrap_or_else(std::env::temp_dir);

        if segments.is_empty() {
            return Err(stop_error.unwrap_or_else(|| {
                RecordingError::CaptureFailed("Nothing was recorded".to_string())
            }));
        }

        if let Err(e) = concat_segments(&self.ffmpeg, segments, output_path, &work_dir).await {
            if let Some(dir) = staging_dir {
                let kept = dir.into_path();
                tracing::error!("Movie file not written, segments kept in {:?}", kept);
            }
            return Err(e.into());
        }

        // The movie holds what was captured before the failure, but the
        // failure itself is still reported.
        match stop_error {
            Some(e) => Err(RecordingError::Incomplete {
                output_path: output_path.to_path_buf(),
                source: Box::new(e),
            }),
            None => Ok(()),
        }
    }

    /// Pause recording
    pub async fn pause(&mut self) -> RecordingResult<()> {
        if self.state() != RecordingState::Recording {
            return Err(RecordingError::NotRecording);
        }

        tracing::info!("Pausing recording");

        let end_time = self.elapsed_ms();
        if let Some(session) = self.sessions.last_mut() {
            session.end(end_time);
        }

        *self.state.write() = RecordingState::Paused;
        self.channel_mut()?.pause().await?;
        let _ = self.event_tx.send(RecordingEvent::Paused);

        Ok(())
    }

    /// Resume recording
    pub async fn resume(&mut self) -> RecordingResult<()> {
        if self.state() != RecordingState::Paused {
            return Err(RecordingError::NotRecording);
        }

        tracing::info!("Resuming recording");

        let next_session = self.current_session + 1;
        self.channel_mut()?.resume(next_session).await?;

        self.current_session = next_session;
        let session = RecordingSession::new(self.current_session, self.elapsed_ms());
        self.sessions.push(session);

        *self.state.write() = RecordingState::Recording;
        let _ = self.event_tx.send(RecordingEvent::Resumed);

        Ok(())
    }

    /// Pause when recording, resume when paused
    pub async fn toggle_pause(&mut self) -> RecordingResult<RecordingState> {
        match self.state() {
            RecordingState::Recording => self.pause().await?,
            RecordingState::Paused => self.resume().await?,
            _ => return Err(RecordingError::NotRecording),
        }
        Ok(self.state())
    }

    /// Surface a capture that failed on its own
    pub fn check_health(&mut self) -> RecordingResult<()> {
        if self.state() != RecordingState::Recording {
            return Ok(());
        }
        match self.channel.as_mut() {
            Some(channel) => channel.check_health(),
            None => Ok(()),
        }
    }

    /// Get recorded duration in milliseconds, pauses excluded
    pub fn duration_ms(&self) -> f64 {
        let completed: f64 = self
            .sessions
            .iter()
            .take(self.sessions.len().saturating_sub(1))
            .map(|s| s.duration_ms)
            .sum();

        let current = match self.sessions.last() {
            Some(s) if s.is_open() => self.elapsed_ms() - s.offset_start_ms,
            Some(s) => s.duration_ms,
            None => 0.0,
        };

        completed + current
    }

    /// Number of sessions in the current recording
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
