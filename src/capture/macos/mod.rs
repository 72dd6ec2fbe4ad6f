//! macOS specifics
//!
//! Device capture itself goes through ffmpeg's AVFoundation input; this module
//! only carries what ffmpeg cannot do for us.

pub mod permissions;

pub use permissions::*;
