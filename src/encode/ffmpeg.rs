//! FFmpeg command construction and helpers
//!
//! ffmpeg is the capture framework this tool drives: it opens the device,
//! encodes and muxes. This module builds its command lines, joins session
//! segments into the final movie and probes the result.

use super::preset::EncodingPreset;
use super::EncodeError;
use crate::capture::{CaptureBackend, DeviceInfo, DeviceKind};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Containers the movie file output can write
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mov", "mp4", "m4v", "mkv"];

/// Device inputs for one capture session
#[derive(Debug, Clone)]
pub struct CaptureInput {
    pub backend: CaptureBackend,
    pub video: DeviceInfo,
    pub audio: Option<DeviceInfo>,
    pub framerate: u32,
}

impl CaptureInput {
    /// ffmpeg input arguments opening the video (and audio) device
    pub fn input_args(&self) -> Vec<String> {
        let framerate = self.framerate.to_string();
        let framerate = framerate.as_str();
        let mut args: Vec<String> = Vec::new();

        match self.backend {
            CaptureBackend::AvFoundation => {
                args.extend(["-f", "avfoundation", "-framerate", framerate].map(String::from));
                if self.video.kind == DeviceKind::Screen {
                    args.extend(["-capture_cursor", "1"].map(String::from));
                }
                let audio = self
                    .audio
                    .as_ref()
                    .map(|a| a.id.as_str())
                    .unwrap_or("none");
                args.push("-i".to_string());
                args.push(format!("{}:{}", self.video.id, audio));
            }
            CaptureBackend::DirectShow => {
                args.extend(
                    ["-f", "dshow", "-rtbufsize", "256M", "-framerate", framerate].map(String::from),
                );
                let mut source = format!("video={}", self.video.id);
                if let Some(audio) = &self.audio {
                    source.push_str(&format!(":audio={}", audio.id));
                }
                args.push("-i".to_string());
                args.push(source);
            }
            CaptureBackend::Video4Linux => {
                args.extend(
                    [
                        "-thread_queue_size",
                        "512",
                        "-f",
                        "v4l2",
                        "-framerate",
                        framerate,
                        "-i",
                        self.video.id.as_str(),
                    ]
                    .map(String::from),
                );
                if let Some(audio) = &self.audio {
                    args.extend(
                        ["-thread_queue_size", "512", "-f", "alsa", "-i", audio.id.as_str()].map(String::from),
                    );
                }
            }
        }

        args
    }
}

/// Builds the ffmpeg command line for one recording segment
#[derive(Debug, Clone)]
pub struct FfmpegCommandBuilder {
    input: CaptureInput,
    preset: EncodingPreset,
    video_codec: String,
    audio_codec: String,
    output_path: PathBuf,
}

impl FfmpegCommandBuilder {
    pub fn new(input: CaptureInput, output_path: PathBuf) -> Self {
        Self {
            input,
            preset: EncodingPreset::default(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            output_path,
        }
    }

    pub fn with_preset(mut self, preset: EncodingPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_video_codec(mut self, codec: String) -> Self {
        self.video_codec = codec;
        self
    }

    pub fn with_audio_codec(mut self, codec: String) -> Self {
        self.audio_codec = codec;
        self
    }

    /// Same command, writing to a different file
    pub fn with_output_path(mut self, output_path: PathBuf) -> Self {
        self.output_path = output_path;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn build(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-y".to_string(),
        ];

        args.extend(self.input.input_args());

        if let Some((width, height)) = self.preset.dimensions() {
            args.push("-vf".to_string());
            args.push(format!("scale={}:{}", width, height));
        }

        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        if self.video_codec == "libx264" {
            args.extend([
                "-preset".to_string(),
                self.preset.h264_preset().to_string(),
                "-crf".to_string(),
                self.preset.crf().to_string(),
            ]);
        }
        args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);

        if self.input.audio.is_some() {
            args.extend([
                "-c:a".to_string(),
                self.audio_codec.clone(),
                "-b:a".to_string(),
                format!("{}k", self.preset.audio_bitrate_kbps()),
            ]);
        } else {
            args.push("-an".to_string());
        }

        if is_quicktime_family(&self.output_path) {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.push(self.output_path.to_string_lossy().to_string());
        args
    }
}

/// Whether the path's container takes `-movflags`
fn is_quicktime_family(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("mov" | "mp4" | "m4v")
    )
}

/// Check that the ffmpeg binary can be executed
pub async fn check_ffmpeg(ffmpeg: &str) -> Result<(), EncodeError> {
    match Command::new(ffmpeg).arg("-version").output().await {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(EncodeError::NotFound(format!(
            "{} -version exited with {}",
            ffmpeg, output.status
        ))),
        Err(e) => Err(EncodeError::NotFound(format!(
            "{} ({}). Please install FFmpeg, e.g. `brew install ffmpeg`",
            ffmpeg, e
        ))),
    }
}

/// Quote a path for an ffmpeg concat list
fn concat_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

/// Contents of a concat demuxer list for `segments`
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|s| format!("file {}\n", concat_quote(s)))
        .collect()
}

/// Move a finished file into place, copying when a rename is not possible
pub fn move_file(from: &Path, to: &Path) -> Result<(), EncodeError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)?;
    Ok(())
}

/// Join recording segments into `output` without re-encoding
///
/// A single segment is simply moved. `work_dir` receives the concat list.
pub async fn concat_segments(
    ffmpeg: &str,
    segments: &[PathBuf],
    output: &Path,
    work_dir: &Path,
) -> Result<(), EncodeError> {
    match segments {
        [] => Err(EncodeError::Ffmpeg("No recorded segments to write".to_string())),
        [single] => {
            tracing::debug!("Moving single segment {:?} to {:?}", single, output);
            move_file(single, output)
        }
        _ => {
            let list_path = work_dir.join("segments.txt");
            std::fs::write(&list_path, concat_list(segments))?;

            tracing::debug!("Joining {} segments into {:?}", segments.len(), output);

            let mut args: Vec<String> = ["-hide_banner", "-y", "-f", "concat", "-safe", "0", "-i"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            args.push(list_path.to_string_lossy().to_string());
            args.extend(["-c".to_string(), "copy".to_string()]);
            if is_quicktime_family(output) {
                args.extend(["-movflags".to_string(), "+faststart".to_string()]);
            }
            args.push(output.to_string_lossy().to_string());

            let result = Command::new(ffmpeg)
                .args(&args)
                .output()
                .await
                .map_err(|e| EncodeError::Ffmpeg(format!("Failed to start FFmpeg: {}", e)))?;

            if !result.status.success() {
                let stderr = String::from_utf8_lossy(&result.stderr);
                return Err(EncodeError::Ffmpeg(format!(
                    "Joining segments failed ({}): {}",
                    result.status,
                    last_lines(&stderr, 5)
                )));
            }
            Ok(())
        }
    }
}

/// The last `count` non-empty lines of an ffmpeg log
pub fn last_lines(log: &str, count: usize) -> String {
    let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Media metadata returned from FFprobe
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_ms: f64,
    pub codec: String,
    pub has_audio: bool,
}

/// Parse an ffprobe frame rate ("30/1", "30000/1001" or "29.97")
pub fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().unwrap_or(0.0);
            let den: f64 = den.parse().unwrap_or(1.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.parse().unwrap_or(0.0),
    }
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, EncodeError> {
    let json: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| EncodeError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .ok_or_else(|| EncodeError::Probe("No streams found in movie".to_string()))?;

    let stream_type = |s: &serde_json::Value| {
        s.get("codec_type")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
    };

    let video_stream = streams
        .iter()
        .find(|s| stream_type(s).as_deref() == Some("video"))
        .ok_or_else(|| EncodeError::Probe("No video stream found".to_string()))?;
    let has_audio = streams
        .iter()
        .any(|s| stream_type(s).as_deref() == Some("audio"));

    let width = video_stream
        .get("width")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let height = video_stream
        .get("height")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let codec = video_stream
        .get("codec_name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let fps = video_stream
        .get("avg_frame_rate")
        .or_else(|| video_stream.get("r_frame_rate"))
        .and_then(|v| v.as_str())
        .map(parse_frame_rate)
        .unwrap_or(0.0);

    // Duration from the format section is more reliable than per stream
    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        width,
        height,
        fps,
        duration_ms: duration_secs * 1000.0,
        codec,
        has_audio,
    })
}

/// Get movie metadata using FFprobe
pub async fn probe_media(ffprobe: &str, path: &Path) -> Result<MediaInfo, EncodeError> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(path)
        .output()
        .await
        .map_err(|e| EncodeError::Probe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(EncodeError::Probe(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}
