//! Native device enumeration using nokhwa (cameras) and cpal (audio inputs)
//!
//! Used on Linux, where ffmpeg has no device listing for v4l2, and as a
//! fallback when the ffmpeg listing comes back empty.

use super::listing::DeviceListing;
use super::traits::{CaptureBackend, DeviceInfo, DeviceKind};
use cpal::traits::{DeviceTrait, HostTrait};
use nokhwa::utils::{ApiBackend, CameraIndex};

/// Get list of available cameras
pub fn get_cameras(backend: CaptureBackend) -> Vec<DeviceInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => camera_id(backend, *i),
                    CameraIndex::String(s) => s.to_string(),
                };
                DeviceInfo::new(id, info.human_name(), DeviceKind::Video)
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Map a camera index to the identifier ffmpeg opens for `backend`
fn camera_id(backend: CaptureBackend, index: u32) -> String {
    match backend {
        CaptureBackend::Video4Linux => format!("/dev/video{}", index),
        CaptureBackend::AvFoundation | CaptureBackend::DirectShow => index.to_string(),
    }
}

/// Name of the system's default audio input
pub fn default_audio_input_name() -> Option<String> {
    cpal::default_host()
        .default_input_device()
        .and_then(|d| d.name().ok())
}

/// Get list of available audio input devices
pub fn get_audio_inputs() -> Vec<DeviceInfo> {
    let host = cpal::default_host();
    let default_name = default_audio_input_name();

    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("Failed to enumerate audio inputs: {}", e);
            return Vec::new();
        }
    };

    devices
        .filter_map(|device| device.name().ok())
        .map(|name| {
            let mut info = DeviceInfo::new(name.clone(), name.clone(), DeviceKind::Audio);
            info.is_default = default_name.as_deref() == Some(name.as_str());
            info
        })
        .collect()
}

/// Enumerate cameras and microphones without going through ffmpeg
pub fn list_devices(backend: CaptureBackend) -> DeviceListing {
    DeviceListing {
        video: get_cameras(backend),
        audio: get_audio_inputs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_id_per_backend() {
        assert_eq!(camera_id(CaptureBackend::Video4Linux, 2), "/dev/video2");
        assert_eq!(camera_id(CaptureBackend::AvFoundation, 2), "2");
    }
}
