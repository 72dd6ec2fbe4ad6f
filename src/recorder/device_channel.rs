//! Device capture channel backed by ffmpeg
//!
//! Each session runs one ffmpeg process that opens the capture device and
//! writes an encoded segment file. Stopping sends `q` on ffmpeg's stdin so
//! the container is finalized properly; a process that ignores it is killed
//! after a timeout.

use super::channel::{RecordingChannel, RecordingError, RecordingResult};
use crate::capture::{has_screen_recording_permission, request_screen_recording_permission, DeviceKind};
use crate::encode::ffmpeg::{check_ffmpeg, last_lines};
use crate::encode::FfmpegCommandBuilder;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// ffmpeg log lines kept for error reports
const LOG_TAIL_LINES: usize = 20;

/// How long ffmpeg gets to open the device and write the output header
const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);

/// A running ffmpeg capture
struct CaptureProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    segment: PathBuf,
    log_tail: Arc<Mutex<VecDeque<String>>>,
    log_task: JoinHandle<()>,
}

impl CaptureProcess {
    fn log_tail(&self) -> String {
        let tail = self.log_tail.lock();
        let joined = tail.iter().cloned().collect::<Vec<_>>().join("\n");
        last_lines(&joined, 5)
    }
}

/// Captures one device (plus its audio) into segment files
pub struct DeviceCaptureChannel {
    /// Channel identifier
    id: String,

    /// ffmpeg binary
    ffmpeg: String,

    /// Command template; the output path is replaced per segment
    command: FfmpegCommandBuilder,

    /// Kind of the video device, for permission checks
    device_kind: DeviceKind,

    /// Directory receiving segment files
    output_dir: Option<PathBuf>,

    /// Current session index
    session_index: usize,

    /// Active capture, if any
    process: Option<CaptureProcess>,

    /// Finished segments
    output_files: Vec<PathBuf>,

    start_timeout: Duration,
    stop_timeout: Duration,
}

impl DeviceCaptureChannel {
    /// Create a new device capture channel
    pub fn new(
        device_name: &str,
        device_kind: DeviceKind,
        ffmpeg: String,
        command: FfmpegCommandBuilder,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            id: format!("device-{}", device_name),
            ffmpeg,
            command,
            device_kind,
            output_dir: None,
            session_index: 0,
            process: None,
            output_files: Vec::new(),
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout,
        }
    }

    /// Segment file for a session, using the final movie's container
    fn segment_path(&self, output_dir: &Path) -> PathBuf {
        let extension = self
            .command
            .output_path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mov");
        output_dir.join(format!("segment-{}.{}", self.session_index, extension))
    }

    /// Forward ffmpeg's log to tracing and keep the tail for error messages
    fn spawn_log_reader(
        child: &mut Child,
        log_tail: Arc<Mutex<VecDeque<String>>>,
        ready_tx: oneshot::Sender<()>,
    ) -> JoinHandle<()> {
        let stderr = child.stderr.take();
        tokio::spawn(async move {
            let Some(stderr) = stderr else {
                return;
            };
            let mut ready_tx = Some(ready_tx);
            let mut lines = BufReader::new(stderr).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!("ffmpeg: {}", line);

                // The output header is written once the first frames arrive
                if line.trim_start().starts_with("Output #0") {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }

                let mut tail = log_tail.lock();
                if tail.len() == LOG_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        })
    }

    /// Keep the segment of a finished process if it holds any data
    fn collect_segment(&mut self, segment: PathBuf) -> bool {
        let has_data = std::fs::metadata(&segment)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if has_data {
            self.output_files.push(segment);
        }
        has_data
    }
}

#[async_trait]
impl RecordingChannel for DeviceCaptureChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, output_dir: &Path, session_index: usize) -> RecordingResult<()> {
        check_ffmpeg(&self.ffmpeg).await?;

        if self.device_kind == DeviceKind::Screen && !has_screen_recording_permission() {
            request_screen_recording_permission();
            return Err(RecordingError::PermissionDenied(
                "Screen recording permission not granted. Please allow it in System Settings and try again."
                    .to_string(),
            ));
        }

        self.output_dir = Some(output_dir.to_path_buf());
        self.session_index = session_index;
        self.output_files.clear();

        tracing::info!("Capture channel {} initialized in {:?}", self.id, output_dir);
        Ok(())
    }

    async fn start(&mut self) -> RecordingResult<()> {
        if self.process.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        let output_dir = self.output_dir.clone().ok_or_else(|| {
            RecordingError::ConfigurationError("Output directory not set".to_string())
        })?;

        let segment = self.segment_path(&output_dir);
        let args = self.command.clone().with_output_path(segment.clone()).build();
        tracing::debug!("Starting {} {}", self.ffmpeg, args.join(" "));

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keep terminal signals (Ctrl+C, Ctrl+Z) away from ffmpeg; we decide
        // when it stops.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| RecordingError::CaptureFailed(format!("Failed to start {}: {}", self.ffmpeg, e)))?;

        let log_tail = Arc::new(Mutex::new(VecDeque::with_capacity(LOG_TAIL_LINES)));
        let (ready_tx, ready_rx) = oneshot::channel();
        let log_task = Self::spawn_log_reader(&mut child, log_tail.clone(), ready_tx);
        let stdin = child.stdin.take();

        let mut process = CaptureProcess {
            child,
            stdin,
            segment,
            log_tail,
            log_task,
        };

        tokio::select! {
            ready = ready_rx => {
                if ready.is_err() {
                    // Log closed without a header; the exit status tells why
                    let status = process.child.wait().await?;
                    let _ = (&mut process.log_task).await;
                    return Err(RecordingError::CaptureFailed(format!(
                        "ffmpeg exited ({}) before recording started: {}",
                        status,
                        process.log_tail()
                    )));
                }
            }
            status = process.child.wait() => {
                let status = status?;
                let _ = (&mut process.log_task).await;
                return Err(RecordingError::CaptureFailed(format!(
                    "ffmpeg exited ({}) before recording started: {}",
                    status,
                    process.log_tail()
                )));
            }
            _ = tokio::time::sleep(self.start_timeout) => {
                tracing::warn!(
                    "No output from {} after {:?}, continuing to wait for frames",
                    self.id,
                    self.start_timeout
                );
            }
        }

        tracing::info!(
            "Capture started for {} (session {}) -> {:?}",
            self.id,
            self.session_index,
            process.segment
        );
        self.process = Some(process);
        Ok(())
    }

    async fn stop(&mut self) -> RecordingResult<()> {
        let Some(mut process) = self.process.take() else {
            return Err(RecordingError::NotRecording);
        };

        if let Some(mut stdin) = process.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                tracing::debug!("Could not send quit to ffmpeg: {}", e);
            }
            let _ = stdin.flush().await;
        }

        let status = match tokio::time::timeout(self.stop_timeout, process.child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                tracing::warn!(
                    "ffmpeg did not finish within {:?}, killing it",
                    self.stop_timeout
                );
                process.child.kill().await?;
                None
            }
        };
        let _ = (&mut process.log_task).await;

        if let Some(status) = status {
            if !status.success() {
                tracing::warn!("ffmpeg exited with {}: {}", status, process.log_tail());
            }
        }

        let tail = process.log_tail();
        let segment = process.segment.clone();
        if !self.collect_segment(segment.clone()) {
            return Err(RecordingError::CaptureFailed(format!(
                "No data written to {:?}: {}",
                segment, tail
            )));
        }

        tracing::info!("Capture stopped for {} (session {})", self.id, self.session_index);
        Ok(())
    }

    async fn pause(&mut self) -> RecordingResult<()> {
        self.stop().await
    }

    async fn resume(&mut self, session_index: usize) -> RecordingResult<()> {
        self.session_index = session_index;
        self.start().await
    }

    fn is_recording(&self) -> bool {
        self.process.is_some()
    }

    fn output_files(&self) -> Vec<PathBuf> {
        self.output_files.clone()
    }

    fn check_health(&mut self) -> RecordingResult<()> {
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };

        match process.child.try_wait()? {
            None => Ok(()),
            Some(status) => {
                let Some(process) = self.process.take() else {
                    return Ok(());
                };
                let tail = process.log_tail();
                // Whatever made it to disk before the failure is kept
                self.collect_segment(process.segment.clone());
                Err(RecordingError::CaptureFailed(format!(
                    "ffmpeg exited unexpectedly ({}): {}",
                    status, tail
                )))
            }
        }
    }
}
