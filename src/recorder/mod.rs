//! Recording system module
//!
//! - RecordingChannel trait for capture pipelines
//! - DeviceCaptureChannel, an ffmpeg process per session
//! - RecordingCoordinator to drive the session and write the movie file

pub mod channel;
pub mod coordinator;
pub mod device_channel;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{RecordingChannel, RecordingError, RecordingResult};
pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use device_channel::DeviceCaptureChannel;
pub use state::{RecordingConfig, RecordingOutput, RecordingSession, RecordingState};
