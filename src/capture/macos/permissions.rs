//! macOS permission handling
//!
//! Screen capture devices need the Screen Recording permission before
//! AVFoundation will deliver frames from them.

use core_graphics::access::ScreenCaptureAccess;

/// Check if screen recording permission is granted
pub fn has_screen_recording_permission() -> bool {
    ScreenCaptureAccess.preflight()
}

/// Request screen recording permission
///
/// Shows the system prompt the first time. Returns true if permission was
/// already granted.
pub fn request_screen_recording_permission() -> bool {
    ScreenCaptureAccess.request()
}
