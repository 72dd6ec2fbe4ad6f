//! ffmpeg device listing
//!
//! Runs `ffmpeg -list_devices true` for the AVFoundation and DirectShow inputs
//! and parses the log output into devices. The ids produced here are exactly
//! what the recorder later hands back to ffmpeg, so enumeration and capture
//! always agree on which device is which.

use super::traits::{CaptureBackend, DeviceError, DeviceInfo, DeviceKind};
use tokio::process::Command;

/// Prefix AVFoundation uses for screen capture devices
const SCREEN_DEVICE_PREFIX: &str = "Capture screen";

/// Devices reported by one listing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceListing {
    pub video: Vec<DeviceInfo>,
    pub audio: Vec<DeviceInfo>,
}

impl DeviceListing {
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Video,
    Audio,
}

/// Ask ffmpeg to list the devices of `backend`
pub async fn list_devices(ffmpeg: &str, backend: CaptureBackend) -> Result<DeviceListing, DeviceError> {
    let args: &[&str] = match backend {
        CaptureBackend::AvFoundation => &["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""],
        CaptureBackend::DirectShow => &["-hide_banner", "-list_devices", "true", "-f", "dshow", "-i", "dummy"],
        CaptureBackend::Video4Linux => {
            return Err(DeviceError::Listing(
                "ffmpeg cannot list v4l2 devices".to_string(),
            ))
        }
    };

    // ffmpeg exits non-zero after listing since no real input was opened,
    // so the status is ignored and only the log is parsed.
    let output = Command::new(ffmpeg)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DeviceError::Listing(format!("Failed to run {}: {}", ffmpeg, e)))?;

    let log = String::from_utf8_lossy(&output.stderr);
    tracing::debug!("{} device listing:\n{}", backend.input_format(), log);

    Ok(match backend {
        CaptureBackend::AvFoundation => parse_avfoundation_listing(&log),
        CaptureBackend::DirectShow => parse_dshow_listing(&log),
        CaptureBackend::Video4Linux => DeviceListing::default(),
    })
}

/// Strip ffmpeg's `[context @ 0x...]` log prefix from a line
fn strip_log_prefix(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('[') {
        if let Some(end) = line.find(']') {
            if line[..end].contains(" @ ") {
                return line[end + 1..].trim_start();
            }
        }
    }
    line
}

/// Parse the output of `ffmpeg -f avfoundation -list_devices true -i ""`
pub fn parse_avfoundation_listing(log: &str) -> DeviceListing {
    let mut listing = DeviceListing::default();
    let mut section = Section::None;

    for line in log.lines() {
        let content = strip_log_prefix(line);

        if content.contains("AVFoundation video devices") {
            section = Section::Video;
            continue;
        }
        if content.contains("AVFoundation audio devices") {
            section = Section::Audio;
            continue;
        }

        // Entries look like "[0] FaceTime HD Camera"
        let Some(rest) = content.strip_prefix('[') else {
            continue;
        };
        let Some((index, name)) = rest.split_once(']') else {
            continue;
        };
        if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        match section {
            Section::Video => {
                let kind = if name.starts_with(SCREEN_DEVICE_PREFIX) {
                    DeviceKind::Screen
                } else {
                    DeviceKind::Video
                };
                listing.video.push(DeviceInfo::new(index, name, kind));
            }
            Section::Audio => {
                listing.audio.push(DeviceInfo::new(index, name, DeviceKind::Audio));
            }
            Section::None => {}
        }
    }

    listing
}

/// Parse the output of `ffmpeg -list_devices true -f dshow -i dummy`
///
/// Handles both the sectioned layout of older ffmpeg releases and the newer
/// one where every entry carries a `(video)` / `(audio)` suffix.
pub fn parse_dshow_listing(log: &str) -> DeviceListing {
    let mut listing = DeviceListing::default();
    let mut section = Section::None;

    for line in log.lines() {
        let content = strip_log_prefix(line);

        if content.contains("DirectShow video devices") {
            section = Section::Video;
            continue;
        }
        if content.contains("DirectShow audio devices") {
            section = Section::Audio;
            continue;
        }
        if content.starts_with("Alternative name") {
            continue;
        }

        let Some(rest) = content.strip_prefix('"') else {
            continue;
        };
        let Some((name, suffix)) = rest.split_once('"') else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let suffix = suffix.trim();
        let (is_video, is_audio) = if suffix.starts_with('(') {
            (suffix.contains("video"), suffix.contains("audio"))
        } else {
            (section == Section::Video, section == Section::Audio)
        };

        if is_video {
            listing.video.push(DeviceInfo::new(name, name, DeviceKind::Video));
        }
        if is_audio {
            listing.audio.push(DeviceInfo::new(name, name, DeviceKind::Audio));
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVFOUNDATION_LOG: &str = r#"[AVFoundation indev @ 0x7fb7c5e04a00] AVFoundation video devices:
[AVFoundation indev @ 0x7fb7c5e04a00] [0] FaceTime HD Camera
[AVFoundation indev @ 0x7fb7c5e04a00] [1] Elgato HD60 S
[AVFoundation indev @ 0x7fb7c5e04a00] [2] Capture screen 0
[AVFoundation indev @ 0x7fb7c5e04a00] AVFoundation audio devices:
[AVFoundation indev @ 0x7fb7c5e04a00] [0] MacBook Pro Microphone
[AVFoundation indev @ 0x7fb7c5e04a00] [1] Elgato HD60 S
[in#0 @ 0x600001f0c000] Error opening input: Input/output error
Error opening input file .
"#;

    #[test]
    fn test_strip_log_prefix() {
        assert_eq!(strip_log_prefix("[dshow @ 000001] \"Cam\" (video)"), "\"Cam\" (video)");
        // Device index brackets are not a log prefix
        assert_eq!(strip_log_prefix("[0] FaceTime HD Camera"), "[0] FaceTime HD Camera");
    }

    #[test]
    fn test_parse_avfoundation_listing() {
        let listing = parse_avfoundation_listing(AVFOUNDATION_LOG);

        assert_eq!(listing.video.len(), 3);
        assert_eq!(listing.video[0].id, "0");
        assert_eq!(listing.video[0].name, "FaceTime HD Camera");
        assert_eq!(listing.video[0].kind, DeviceKind::Video);
        assert_eq!(listing.video[2].kind, DeviceKind::Screen);

        assert_eq!(listing.audio.len(), 2);
        assert_eq!(listing.audio[1].id, "1");
        assert_eq!(listing.audio[1].name, "Elgato HD60 S");
        assert!(listing.audio.iter().all(|d| d.kind == DeviceKind::Audio));
    }

    #[test]
    fn test_parse_avfoundation_listing_without_devices() {
        let log = "[AVFoundation indev @ 0x1] AVFoundation video devices:\n\
                   [AVFoundation indev @ 0x1] AVFoundation audio devices:\n";
        assert!(parse_avfoundation_listing(log).is_empty());
    }

    #[test]
    fn test_parse_dshow_listing_new_format() {
        let log = r#"[dshow @ 000001c8e1e4a340] "Integrated Webcam" (video)
[dshow @ 000001c8e1e4a340]   Alternative name "@device_pnp_\\?\usb#vid_0c45"
[dshow @ 000001c8e1e4a340] "AVerMedia Live Gamer" (audio, video)
[dshow @ 000001c8e1e4a340] "Microphone Array (Realtek(R) Audio)" (audio)
dummy: Immediate exit requested
"#;
        let listing = parse_dshow_listing(log);

        let video: Vec<_> = listing.video.iter().map(|d| d.name.as_str()).collect();
        let audio: Vec<_> = listing.audio.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(video, vec!["Integrated Webcam", "AVerMedia Live Gamer"]);
        assert_eq!(audio, vec!["AVerMedia Live Gamer", "Microphone Array (Realtek(R) Audio)"]);
        // dshow opens devices by name
        assert_eq!(listing.video[0].id, "Integrated Webcam");
    }

    #[test]
    fn test_parse_dshow_listing_sectioned_format() {
        let log = r#"[dshow @ 0000000000376f20] DirectShow video devices (some may be both video and audio devices)
[dshow @ 0000000000376f20]  "USB2.0 HD UVC WebCam"
[dshow @ 0000000000376f20]     Alternative name "@device_pnp_\\?\usb"
[dshow @ 0000000000376f20] DirectShow audio devices
[dshow @ 0000000000376f20]  "Microphone (Realtek High Definition Audio)"
"#;
        let listing = parse_dshow_listing(log);
        assert_eq!(listing.video.len(), 1);
        assert_eq!(listing.video[0].name, "USB2.0 HD UVC WebCam");
        assert_eq!(listing.audio.len(), 1);
        assert_eq!(listing.audio[0].name, "Microphone (Realtek High Definition Audio)");
    }
}
