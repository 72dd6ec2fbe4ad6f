//! Recording command
//!
//! Picks the devices, waits out the start delay, records until a signal,
//! the duration limit or a capture failure ends it, then writes the movie.

use crate::capture::{CaptureBackend, DeviceCatalog, DeviceInfo};
use crate::cli::Args;
use crate::config::{default_generated_filename, resolve_output_path, Settings};
use crate::encode::ffmpeg::probe_media;
use crate::encode::{CaptureInput, FfmpegCommandBuilder};
use crate::recorder::{
    DeviceCaptureChannel, RecordingConfig, RecordingCoordinator, RecordingError, RecordingEvent,
    RecordingOutput, RecordingState,
};
use crate::signals::{ControlSignal, SignalListener};
use crate::utils::error::{EXIT_CANCELLED, EXIT_SUCCESS};
use crate::utils::{AppError, AppResult};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;

/// How often the recording loop checks the duration limit and capture health
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a recording run ended
#[derive(Debug)]
pub enum RecordOutcome {
    Finished(RecordingOutput),
    /// Stopped during the start delay, nothing was recorded
    Cancelled,
}

impl RecordOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RecordOutcome::Finished(_) => EXIT_SUCCESS,
            RecordOutcome::Cancelled => EXIT_CANCELLED,
        }
    }
}

/// Start delay as a `Duration`, rejecting values it cannot hold
pub fn delay_duration(delay_secs: f64) -> AppResult<Duration> {
    Duration::try_from_secs_f64(delay_secs).map_err(|_| {
        AppError::InvalidArgument(format!("Invalid delay of {} seconds", delay_secs))
    })
}

/// Resolve the devices, output file and preset for a recording
pub fn build_config(
    args: &Args,
    settings: &Settings,
    catalog: &DeviceCatalog,
) -> AppResult<(RecordingConfig, DeviceInfo, Option<DeviceInfo>)> {
    let device = catalog.select(args.device.as_deref())?.clone();

    let audio = if args.no_audio || !settings.capture_audio {
        None
    } else {
        let audio = catalog.audio_device_for(&device).cloned();
        if audio.is_none() {
            tracing::warn!("No audio device found, recording video only");
        }
        audio
    };

    let requested = args
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_generated_filename()));
    let output_path = resolve_output_path(&requested)?;

    let config = RecordingConfig {
        output_path,
        device_name: device.name.clone(),
        audio_device_name: audio.as_ref().map(|a| a.name.clone()),
        preset: args.preset.unwrap_or(settings.encoding_preset),
        max_duration_secs: args.duration,
        delay_secs: args.delay.unwrap_or(settings.delay_seconds),
    };

    Ok((config, device, audio))
}

/// Record from the selected device to a movie file
pub async fn record(args: &Args, settings: &Settings) -> AppResult<RecordOutcome> {
    let backend = CaptureBackend::native();
    let catalog = DeviceCatalog::discover(&settings.ffmpeg_path, backend).await?;
    let (config, device, audio) = build_config(args, settings, &catalog)?;

    let delay = delay_duration(config.delay_secs)?;

    if args.verbose {
        println!("Using device: {} ({:?})", config.device_name, device.kind);
        match &config.audio_device_name {
            Some(name) => println!("Using audio device: {}", name),
            None => println!("Not capturing audio"),
        }
        println!("Encoding preset: {}", config.preset);
        if let Some(seconds) = config.max_duration_secs {
            println!("Capturing {} seconds of video", seconds);
        }
    }

    let input = CaptureInput {
        backend,
        video: device.clone(),
        audio,
        framerate: settings.frames_per_second,
    };
    let command = FfmpegCommandBuilder::new(input, config.output_path.clone())
        .with_preset(config.preset)
        .with_video_codec(settings.video_codec.clone())
        .with_audio_codec(settings.audio_codec.clone());
    let channel = DeviceCaptureChannel::new(
        &device.name,
        device.kind,
        settings.ffmpeg_path.clone(),
        command,
        Duration::from_millis(settings.stop_timeout_ms),
    );

    let mut coordinator = RecordingCoordinator::new(settings.ffmpeg_path.clone());
    coordinator.set_channel(Box::new(channel));
    tokio::spawn(log_events(coordinator.subscribe()));

    // Listen before the delay so an early Ctrl+C cancels cleanly
    let mut signals = SignalListener::install()?;

    if args.verbose && !delay.is_zero() {
        println!("Delaying for {} seconds", config.delay_secs);
    }
    if !wait_for_delay(delay, &mut signals).await {
        eprintln!("Cancelled before recording started");
        return Ok(RecordOutcome::Cancelled);
    }

    coordinator.start(&config).await?;
    println!("Recording to '{}' (Ctrl+C to stop, Ctrl+Z to pause)", config.output_path.display());

    let capture_error = run_until_stopped(&mut coordinator, &mut signals, config.max_duration_secs).await;

    let output = report_stop(&mut std::io::stdout(), coordinator.stop().await, capture_error)?;

    if args.verbose {
        println!(
            "Recorded {:.2} seconds in {} session(s)",
            output.total_duration_ms / 1000.0,
            output.session_count
        );
        match probe_media(&settings.ffprobe_path, &output.output_path).await {
            Ok(info) => println!(
                "{}x{} {} at {:.2} fps, {:.2} seconds{}",
                info.width,
                info.height,
                info.codec,
                info.fps,
                info.duration_ms / 1000.0,
                if info.has_audio { " with audio" } else { "" }
            ),
            Err(e) => tracing::warn!("Could not inspect {:?}: {}", output.output_path, e),
        }
    }

    Ok(RecordOutcome::Finished(output))
}

/// Tell the user where the movie went, then surface any capture failure
///
/// The file location is printed whenever a movie was written, even when the
/// recording as a whole failed.
fn report_stop(
    out: &mut impl Write,
    stopped: Result<RecordingOutput, RecordingError>,
    capture_error: Option<RecordingError>,
) -> AppResult<RecordingOutput> {
    let output = match stopped {
        Ok(output) => output,
        Err(RecordingError::Incomplete { output_path, source }) => {
            writeln!(out, "Finished recording to file: '{}'", output_path.display())?;
            return Err((*source).into());
        }
        Err(e) => return Err(e.into()),
    };

    writeln!(out, "Finished recording to file: '{}'", output.output_path.display())?;
    match capture_error {
        Some(e) => Err(e.into()),
        None => Ok(output),
    }
}

/// Wait out the start delay; false when a stop signal arrives first
async fn wait_for_delay(delay: Duration, signals: &mut SignalListener) -> bool {
    if delay.is_zero() {
        return true;
    }

    let delay = tokio::time::sleep(delay);
    tokio::pin!(delay);

    loop {
        tokio::select! {
            _ = &mut delay => return true,
            signal = signals.recv() => match signal {
                ControlSignal::Stop => return false,
                // Nothing to pause yet
                ControlSignal::TogglePause => {}
            },
        }
    }
}

/// Record until stopped; returns the capture failure that ended it, if any
async fn run_until_stopped(
    coordinator: &mut RecordingCoordinator,
    signals: &mut SignalListener,
    max_duration_secs: Option<f64>,
) -> Option<RecordingError> {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                ControlSignal::Stop => {
                    tracing::info!("Stop requested");
                    return None;
                }
                ControlSignal::TogglePause => match coordinator.toggle_pause().await {
                    Ok(RecordingState::Paused) => println!("Recording paused (Ctrl+Z to resume)"),
                    Ok(_) => println!("Recording resumed"),
                    Err(e) => {
                        tracing::error!("Failed to toggle pause: {}", e);
                        return Some(e);
                    }
                },
            },
            _ = ticker.tick() => {
                if let Err(e) = coordinator.check_health() {
                    tracing::error!("Capture failed: {}", e);
                    return Some(e);
                }
                if let Some(limit) = max_duration_secs {
                    if coordinator.duration_ms() >= limit * 1000.0 {
                        tracing::info!("Recording duration of {} seconds reached", limit);
                        return None;
                    }
                }
            }
        }
    }
}

/// Log coordinator events until the coordinator goes away
async fn log_events(mut events: broadcast::Receiver<RecordingEvent>) {
    loop {
        match events.recv().await {
            Ok(RecordingEvent::Started { output_path }) => {
                tracing::info!("Recording started: {:?}", output_path)
            }
            Ok(RecordingEvent::Paused) => tracing::info!("Recording paused"),
            Ok(RecordingEvent::Resumed) => tracing::info!("Recording resumed"),
            Ok(RecordingEvent::Finished { output_path, error: None }) => {
                tracing::info!("Movie file written: {:?}", output_path)
            }
            Ok(RecordingEvent::Finished { output_path, error: Some(error) }) => {
                tracing::error!("Movie file {:?} not finished: {}", output_path, error)
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Missed {} recording events", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::listing::DeviceListing;
    use crate::capture::DeviceKind;
    use crate::encode::EncodingPreset;
    use crate::recorder::testing::FakeChannel;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn catalog() -> DeviceCatalog {
        DeviceCatalog::from_listing(
            CaptureBackend::AvFoundation,
            DeviceListing {
                video: vec![
                    DeviceInfo::new("0", "FaceTime HD Camera", DeviceKind::Video),
                    DeviceInfo::new("1", "Elgato Cam Link", DeviceKind::Video),
                ],
                audio: vec![
                    DeviceInfo::new("0", "MacBook Pro Microphone", DeviceKind::Audio),
                    DeviceInfo::new("1", "Elgato Cam Link", DeviceKind::Audio),
                ],
            },
        )
    }

    fn args(list: &[&str]) -> Args {
        Args::try_parse_from_args(std::iter::once("videosnap").chain(list.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie");
        let args = args(&[file.to_str().unwrap()]);

        let (config, device, audio) = build_config(&args, &Settings::default(), &catalog()).unwrap();
        assert_eq!(device.name, "FaceTime HD Camera");
        assert_eq!(audio.unwrap().name, "MacBook Pro Microphone");
        assert_eq!(config.output_path, dir.path().join("movie.mov"));
        assert_eq!(config.preset, EncodingPreset::High);
        assert_eq!(config.delay_secs, 0.5);
        assert_eq!(config.max_duration_secs, None);
    }

    #[test]
    fn test_muxed_device_uses_own_audio() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mp4");
        let args = args(&["-d", "Elgato Cam Link", "-t", "3", file.to_str().unwrap()]);

        let (config, device, audio) = build_config(&args, &Settings::default(), &catalog()).unwrap();
        assert_eq!(device.kind, DeviceKind::Muxed);
        assert_eq!(audio.unwrap().id, "1");
        assert_eq!(config.audio_device_name.as_deref(), Some("Elgato Cam Link"));
        assert_eq!(config.max_duration_secs, Some(3.0));
    }

    #[test]
    fn test_no_audio() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mov");
        let args = args(&["--no-audio", file.to_str().unwrap()]);

        let (config, _, audio) = build_config(&args, &Settings::default(), &catalog()).unwrap();
        assert!(audio.is_none());
        assert!(config.audio_device_name.is_none());

        let settings = Settings {
            capture_audio: false,
            ..Settings::default()
        };
        let args = super::tests::args(&[file.to_str().unwrap()]);
        let (_, _, audio) = build_config(&args, &settings, &catalog()).unwrap();
        assert!(audio.is_none());
    }

    #[test]
    fn test_flags_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mov");
        let settings = Settings {
            encoding_preset: EncodingPreset::Low,
            delay_seconds: 2.0,
            ..Settings::default()
        };

        let (config, _, _) = build_config(&args(&[file.to_str().unwrap()]), &settings, &catalog()).unwrap();
        assert_eq!(config.preset, EncodingPreset::Low);
        assert_eq!(config.delay_secs, 2.0);

        let args = args(&["-p", "1920x1080", "-w", "0", file.to_str().unwrap()]);
        let (config, _, _) = build_config(&args, &settings, &catalog()).unwrap();
        assert_eq!(config.preset, EncodingPreset::Hd1080);
        assert_eq!(config.delay_secs, 0.0);
    }

    #[test]
    fn test_unknown_device() {
        let args = args(&["-d", "Nonexistent Camera"]);
        let err = build_config(&args, &Settings::default(), &catalog()).unwrap_err();
        assert!(matches!(err, AppError::Device(_)));
        assert_eq!(err.to_string(), "Device \"Nonexistent Camera\" not found");
    }

    #[test]
    fn test_no_devices() {
        let empty = DeviceCatalog::from_listing(CaptureBackend::AvFoundation, DeviceListing::default());
        let err = build_config(&args(&[]), &Settings::default(), &empty).unwrap_err();
        assert_eq!(err.to_string(), "No video devices found");
    }

    fn signals() -> (mpsc::Sender<ControlSignal>, SignalListener) {
        let (tx, rx) = mpsc::channel(4);
        (tx, SignalListener::from_receiver(rx))
    }

    fn recording_config(output_path: PathBuf) -> RecordingConfig {
        RecordingConfig {
            output_path,
            device_name: "FaceTime HD Camera".to_string(),
            audio_device_name: None,
            preset: EncodingPreset::High,
            max_duration_secs: None,
            delay_secs: 0.0,
        }
    }

    async fn recording(dir: &Path, channel: FakeChannel) -> RecordingCoordinator {
        let mut coordinator = RecordingCoordinator::new("ffmpeg");
        coordinator.set_channel(Box::new(channel));
        coordinator
            .start(&recording_config(dir.join("movie.mov")))
            .await
            .unwrap();
        coordinator
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RecordOutcome::Cancelled.exit_code(), 130);
        let output = RecordingOutput {
            output_path: PathBuf::from("movie.mov"),
            total_duration_ms: 0.0,
            session_count: 1,
            segment_count: 1,
        };
        assert_eq!(RecordOutcome::Finished(output).exit_code(), 0);
    }

    #[test]
    fn test_delay_duration() {
        assert_eq!(delay_duration(0.5).unwrap(), Duration::from_millis(500));
        assert!(matches!(delay_duration(1e30), Err(AppError::InvalidArgument(_))));
        assert!(delay_duration(-1.0).is_err());
        assert!(delay_duration(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_wait() {
        let (_tx, mut signals) = signals();
        assert!(wait_for_delay(Duration::ZERO, &mut signals).await);
    }

    #[tokio::test]
    async fn test_stop_during_delay_cancels() {
        let (tx, mut signals) = signals();
        tx.send(ControlSignal::Stop).await.unwrap();

        let waited = tokio::time::timeout(
            Duration::from_secs(2),
            wait_for_delay(Duration::from_secs(60), &mut signals),
        )
        .await;
        assert_eq!(waited, Ok(false));
    }

    #[tokio::test]
    async fn test_pause_during_delay_is_ignored() {
        let (tx, mut signals) = signals();
        tx.send(ControlSignal::TogglePause).await.unwrap();
        assert!(wait_for_delay(Duration::from_millis(50), &mut signals).await);
    }

    #[tokio::test]
    async fn test_recording_stops_at_duration_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = recording(dir.path(), FakeChannel::new(log)).await;
        let (_tx, mut signals) = signals();

        let ended = tokio::time::timeout(
            Duration::from_secs(5),
            run_until_stopped(&mut coordinator, &mut signals, Some(0.2)),
        )
        .await
        .unwrap();

        assert!(ended.is_none());
        assert!(coordinator.duration_ms() >= 200.0);
        assert_eq!(coordinator.state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn test_recording_ends_on_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut channel = FakeChannel::new(log);
        channel.fail_health = true;
        let mut coordinator = recording(dir.path(), channel).await;
        let (_tx, mut signals) = signals();

        let ended = tokio::time::timeout(
            Duration::from_secs(5),
            run_until_stopped(&mut coordinator, &mut signals, None),
        )
        .await
        .unwrap();
        assert!(matches!(ended, Some(RecordingError::CaptureFailed(_))));

        // What was captured is still written
        let output = report_stop(&mut Vec::<u8>::new(), coordinator.stop().await, None).unwrap();
        assert!(output.output_path.exists());
    }

    #[tokio::test]
    async fn test_signals_pause_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = recording(dir.path(), FakeChannel::new(log.clone())).await;
        let (tx, mut signals) = signals();

        tx.send(ControlSignal::TogglePause).await.unwrap();
        tx.send(ControlSignal::Stop).await.unwrap();
        let ended = run_until_stopped(&mut coordinator, &mut signals, None).await;

        assert!(ended.is_none());
        assert_eq!(coordinator.state(), RecordingState::Paused);
        assert!(log.lock().contains(&"pause".to_string()));
    }

    #[test]
    fn test_report_prints_written_file_before_failure() {
        let mut out = Vec::new();
        let stopped = Err(RecordingError::Incomplete {
            output_path: PathBuf::from("/movies/clip.mov"),
            source: Box::new(RecordingError::CaptureFailed("encoder crashed".to_string())),
        });

        let err = report_stop(&mut out, stopped, None).unwrap_err();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Finished recording to file: '/movies/clip.mov'\n"
        );
        assert!(matches!(
            err,
            AppError::Recording(RecordingError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_report_surfaces_capture_error_after_writing() {
        let mut out = Vec::new();
        let output = RecordingOutput {
            output_path: PathBuf::from("/movies/clip.mov"),
            total_duration_ms: 1500.0,
            session_count: 1,
            segment_count: 1,
        };

        let err = report_stop(
            &mut out,
            Ok(output),
            Some(RecordingError::CaptureFailed("device unplugged".to_string())),
        )
        .unwrap_err();
        assert!(String::from_utf8(out).unwrap().starts_with("Finished recording to file:"));
        assert!(matches!(err, AppError::Recording(_)));
    }

    #[test]
    fn test_report_without_movie_prints_nothing() {
        let mut out: Vec<u8> = Vec::new();
        assert!(report_stop(&mut out, Err(RecordingError::NotRecording), None).is_err());
        assert!(out.is_empty());
    }
}
