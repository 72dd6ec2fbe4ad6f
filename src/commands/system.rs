//! System information
//!
//! Version and platform details printed in verbose mode.

use crate::capture::CaptureBackend;
use std::fmt;

/// System information
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub version: String,
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub backend: CaptureBackend,
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VideoSnap v{} on {} {} ({}), capturing with {}",
            self.version,
            self.os,
            self.os_version,
            self.arch,
            self.backend.input_format()
        )
    }
}

/// Describe this build and the machine it runs on
pub fn describe() -> SystemInfo {
    SystemInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        os: std::env::consts::OS.to_string(),
        os_version: get_os_version(),
        arch: std::env::consts::ARCH.to_string(),
        backend: CaptureBackend::native(),
    }
}

fn get_os_version() -> String {
    #[cfg(target_os = "macos")]
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output();

    #[cfg(target_os = "windows")]
    let output = std::process::Command::new("cmd").args(["/C", "ver"]).output();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let output = std::process::Command::new("uname").arg("-r").output();

    output
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}
