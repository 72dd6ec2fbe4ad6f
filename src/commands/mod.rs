//! Program actions
//!
//! Each command implements one thing the command line can ask for.

pub mod devices;
pub mod recording;
pub mod system;
