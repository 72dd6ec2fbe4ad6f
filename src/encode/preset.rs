//! Encoding presets
//!
//! The fixed set of named quality profiles a recording can use. Each preset
//! resolves to an output size, an x264 quality target and an audio bitrate.

use super::EncodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named encoding profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncodingPreset {
    /// Small preview quality (192x144)
    Low,
    /// Medium quality (480x360)
    Medium,
    /// Highest quality the device delivers, at its native resolution
    High,
    Vga,
    Qhd,
    Hd720,
    Hd1080,
    Uhd,
}

impl EncodingPreset {
    /// Every preset, in the order presented to users
    pub const ALL: [EncodingPreset; 8] = [
        EncodingPreset::Low,
        EncodingPreset::Medium,
        EncodingPreset::High,
        EncodingPreset::Vga,
        EncodingPreset::Qhd,
        EncodingPreset::Hd720,
        EncodingPreset::Hd1080,
        EncodingPreset::Uhd,
    ];

    /// Name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            EncodingPreset::Low => "Low",
            EncodingPreset::Medium => "Medium",
            EncodingPreset::High => "High",
            EncodingPreset::Vga => "640x480",
            EncodingPreset::Qhd => "960x540",
            EncodingPreset::Hd720 => "1280x720",
            EncodingPreset::Hd1080 => "1920x1080",
            EncodingPreset::Uhd => "3840x2160",
        }
    }

    /// Output frame size, or None to keep the device's native size
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            EncodingPreset::Low => Some((192, 144)),
            EncodingPreset::Medium => Some((480, 360)),
            EncodingPreset::High => None,
            EncodingPreset::Vga => Some((640, 480)),
            EncodingPreset::Qhd => Some((960, 540)),
            EncodingPreset::Hd720 => Some((1280, 720)),
            EncodingPreset::Hd1080 => Some((1920, 1080)),
            EncodingPreset::Uhd => Some((3840, 2160)),
        }
    }

    /// Get the CRF value for H.264 encoding
    /// Lower values = higher quality, larger files
    pub fn crf(&self) -> u8 {
        match self {
            EncodingPreset::Low => 28,
            EncodingPreset::Medium | EncodingPreset::Vga => 23,
            EncodingPreset::Qhd => 22,
            EncodingPreset::Hd720 | EncodingPreset::Hd1080 => 20,
            EncodingPreset::High | EncodingPreset::Uhd => 18,
        }
    }

    /// Get the x264 speed preset
    ///
    /// Capture encodes in real time, so nothing slower than `veryfast`.
    pub fn h264_preset(&self) -> &'static str {
        match self {
            EncodingPreset::Low | EncodingPreset::Uhd => "ultrafast",
            _ => "veryfast",
        }
    }

    /// AAC bitrate in kbps
    pub fn audio_bitrate_kbps(&self) -> u32 {
        match self {
            EncodingPreset::Low => 64,
            EncodingPreset::Medium => 96,
            EncodingPreset::High => 192,
            _ => 128,
        }
    }

    /// Comma separated list of preset names for help and error text
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for EncodingPreset {
    fn default() -> Self {
        EncodingPreset::High
    }
}

impl fmt::Display for EncodingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncodingPreset {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                EncodeError::InvalidPreset(format!(
                    "\"{}\" (available presets: {})",
                    wanted,
                    Self::names()
                ))
            })
    }
}

impl TryFrom<String> for EncodingPreset {
    type Error = EncodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EncodingPreset> for String {
    fn from(preset: EncodingPreset) -> Self {
        preset.name().to_string()
    }
}
