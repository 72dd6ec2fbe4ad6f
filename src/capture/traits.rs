//! Capture device definitions
//!
//! Platform-agnostic types describing capture devices and the backend used to
//! open them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Device discovery and selection errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No video devices found")]
    NoDevices,

    #[error("Device \"{0}\" not found")]
    NotFound(String),

    #[error("Device listing failed: {0}")]
    Listing(String),
}

/// What a capture device provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Video only (cameras)
    Video,
    /// Video with its own audio stream (capture cards, some webcams)
    Muxed,
    /// Screen capture device
    Screen,
    /// Audio input only (microphones)
    Audio,
}

/// Information about a capture device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Backend-specific identifier (avfoundation index, v4l2 path, dshow name)
    pub id: String,

    /// Human readable device name
    pub name: String,

    /// Device kind
    pub kind: DeviceKind,

    /// Whether this is the default device of its kind
    pub is_default: bool,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            is_default: false,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The ffmpeg input device family used to open capture devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// macOS AVFoundation
    AvFoundation,
    /// Windows DirectShow
    DirectShow,
    /// Linux Video4Linux2 (video) with ALSA (audio)
    Video4Linux,
}

impl CaptureBackend {
    /// Backend for the platform we were compiled for
    pub fn native() -> Self {
        #[cfg(target_os = "macos")]
        {
            CaptureBackend::AvFoundation
        }

        #[cfg(target_os = "windows")]
        {
            CaptureBackend::DirectShow
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            CaptureBackend::Video4Linux
        }
    }

    /// ffmpeg `-f` value for the video input
    pub fn input_format(&self) -> &'static str {
        match self {
            CaptureBackend::AvFoundation => "avfoundation",
            CaptureBackend::DirectShow => "dshow",
            CaptureBackend::Video4Linux => "v4l2",
        }
    }

    /// Whether ffmpeg can enumerate devices for this backend with `-list_devices`
    pub fn supports_ffmpeg_listing(&self) -> bool {
        matches!(self, CaptureBackend::AvFoundation | CaptureBackend::DirectShow)
    }
}

/// Check if screen recording permission is granted
pub fn has_screen_recording_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        super::macos::permissions::has_screen_recording_permission()
    }

    #[cfg(not(target_os = "macos"))]
    {
        // Only macOS gates screen capture behind a permission
        true
    }
}

/// Request screen recording permission
pub fn request_screen_recording_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        super::macos::permissions::request_screen_recording_permission()
    }

    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_serializes_camel_case() {
        let mut device = DeviceInfo::new("0", "FaceTime HD Camera", DeviceKind::Video);
        device.is_default = true;
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"isDefault\":true"));
        assert!(json.contains("\"kind\":\"video\""));
    }
}
