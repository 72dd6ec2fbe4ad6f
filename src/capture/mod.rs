//! Capture device discovery
//!
//! Finds the cameras, screens and microphones attached to this machine and
//! picks the ones a recording will use.

pub mod discovery;
pub mod listing;
pub mod native;
pub mod traits;

#[cfg(target_os = "macos")]
pub mod macos;

pub use discovery::DeviceCatalog;
pub use traits::{CaptureBackend, DeviceError, DeviceInfo, DeviceKind};

// Re-export permission functions from traits (which delegates to platform)
pub use traits::{has_screen_recording_permission, request_screen_recording_permission};
