//! Device discovery and selection

use super::listing::{self, DeviceListing};
use super::native;
use super::traits::{CaptureBackend, DeviceError, DeviceInfo, DeviceKind};

/// All capture devices found on this machine
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    backend: CaptureBackend,
    video: Vec<DeviceInfo>,
    audio: Vec<DeviceInfo>,
}

impl DeviceCatalog {
    /// Discover all video, muxed, screen and audio capture devices
    pub async fn discover(ffmpeg: &str, backend: CaptureBackend) -> Result<Self, DeviceError> {
        let mut found = DeviceListing::default();

        if backend.supports_ffmpeg_listing() {
            match listing::list_devices(ffmpeg, backend).await {
                Ok(devices) => found = devices,
                Err(e) => tracing::warn!("ffmpeg device listing failed: {}", e),
            }
        }

        if found.is_empty() {
            tracing::debug!("Falling back to native device enumeration");
            found = tokio::task::spawn_blocking(move || native::list_devices(backend))
                .await
                .map_err(|e| DeviceError::Listing(format!("Device enumeration task failed: {}", e)))?;
        } else if !found.audio.is_empty() {
            // ffmpeg lists inputs in device order; the OS knows the default
            let default_name = tokio::task::spawn_blocking(native::default_audio_input_name)
                .await
                .ok()
                .flatten();
            if let Some(name) = default_name {
                mark_default_audio(&mut found.audio, &name);
            }
        }

        let catalog = Self::from_listing(backend, found);
        tracing::debug!(
            "Discovered {} video and {} audio devices",
            catalog.video.len(),
            catalog.audio.len()
        );
        Ok(catalog)
    }

    /// Build a catalog from a raw listing, classifying muxed devices and
    /// marking defaults
    pub fn from_listing(backend: CaptureBackend, listing: DeviceListing) -> Self {
        let DeviceListing { mut video, mut audio } = listing;

        // A video device whose name also shows up as an audio input carries
        // its own audio stream.
        for device in video.iter_mut() {
            if device.kind == DeviceKind::Video && audio.iter().any(|a| a.name == device.name) {
                device.kind = DeviceKind::Muxed;
            }
        }

        for device in video.iter_mut() {
            device.is_default = false;
        }
        if let Some(first) = video.first_mut() {
            first.is_default = true;
        }

        if !audio.iter().any(|a| a.is_default) {
            if let Some(first) = audio.first_mut() {
                first.is_default = true;
            }
        }

        Self { backend, video, audio }
    }

    pub fn backend(&self) -> CaptureBackend {
        self.backend
    }

    /// Video-capable devices (cameras, muxed devices, screens)
    pub fn video_devices(&self) -> &[DeviceInfo] {
        &self.video
    }

    /// Audio input devices
    pub fn audio_devices(&self) -> &[DeviceInfo] {
        &self.audio
    }

    /// The default video device (first found), if any
    pub fn default_device(&self) -> Option<&DeviceInfo> {
        self.video.first()
    }

    /// A video device matching on its display name
    pub fn device_named(&self, name: &str) -> Option<&DeviceInfo> {
        self.video.iter().find(|d| d.name == name)
    }

    /// Resolve the requested device, or the default when none is requested
    pub fn select(&self, name: Option<&str>) -> Result<&DeviceInfo, DeviceError> {
        match name {
            Some(name) => self
                .device_named(name)
                .ok_or_else(|| DeviceError::NotFound(name.to_string())),
            None => self.default_device().ok_or(DeviceError::NoDevices),
        }
    }

    /// Pick the audio source to record alongside `video_device`
    ///
    /// Muxed devices supply their own audio; anything else gets the default
    /// audio input, if there is one.
    pub fn audio_device_for(&self, video_device: &DeviceInfo) -> Option<&DeviceInfo> {
        if video_device.kind == DeviceKind::Muxed {
            if let Some(own) = self.audio.iter().find(|a| a.name == video_device.name) {
                return Some(own);
            }
        }

        self.audio
            .iter()
            .find(|a| a.is_default)
            .or_else(|| self.audio.first())
    }
}

/// Mark the audio device called `name` as the default, if it is listed
pub fn mark_default_audio(audio: &mut [DeviceInfo], name: &str) {
    if !audio.iter().any(|a| a.name == name) {
        tracing::debug!("Default audio input {:?} not in ffmpeg's listing", name);
        return;
    }
    for device in audio.iter_mut() {
        device.is_default = device.name == name;
    }
}
