//! Settings file and recording defaults
//!
//! Settings come from an optional TOML file; command-line flags override them.

use crate::encode::ffmpeg::SUPPORTED_EXTENSIONS;
use crate::encode::EncodingPreset;
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FRAMES_PER_SECOND: u32 = 30;

/// Seconds to wait before capturing starts
pub const DEFAULT_RECORDING_DELAY: f64 = 0.5;

pub const DEFAULT_ENCODING_PRESET: EncodingPreset = EncodingPreset::High;

pub const DEFAULT_EXTENSION: &str = "mov";

const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;

/// Longest duration or delay accepted, one year
pub const MAX_SECONDS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Environment variable pointing at an alternative settings file
pub const CONFIG_ENV_VAR: &str = "VIDEOSNAP_CONFIG";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub frames_per_second: u32,
    pub delay_seconds: f64,
    pub encoding_preset: EncodingPreset,
    pub video_codec: String,
    pub audio_codec: String,
    pub capture_audio: bool,
    /// How long ffmpeg gets to finish the file after being asked to quit
    pub stop_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            delay_seconds: DEFAULT_RECORDING_DELAY,
            encoding_preset: DEFAULT_ENCODING_PRESET,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            capture_audio: true,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Load settings from `$VIDEOSNAP_CONFIG` or the user config directory
    pub fn load() -> AppResult<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a file, defaults when it does not exist
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;

        tracing::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    fn validate(&self) -> AppResult<()> {
        if self.frames_per_second == 0 {
            return Err(AppError::Config("frames_per_second must be positive".to_string()));
        }
        if !self.delay_seconds.is_finite() || self.delay_seconds < 0.0 {
            return Err(AppError::Config("delay_seconds must not be negative".to_string()));
        }
        if self.delay_seconds > MAX_SECONDS {
            return Err(AppError::Config(format!(
                "delay_seconds must be at most {} seconds",
                MAX_SECONDS
            )));
        }
        Ok(())
    }
}

/// Settings file location
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("videosnap").join("config.toml"))
}

/// Timestamped file name used when no output file is given
pub fn default_generated_filename() -> String {
    format!(
        "videosnap-{}.{}",
        chrono::Local::now().format("%Y-%m-%d-at-%H.%M.%S"),
        DEFAULT_EXTENSION
    )
}

/// Check the output path and add the default extension if it has none
///
/// Existing files are never overwritten.
pub fn resolve_output_path(path: &Path) -> AppResult<PathBuf> {
    let mut path = path.to_path_buf();

    // ".mov" has no extension as far as Path is concerned, only a name
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        let bare = name.strip_prefix('.').map(str::to_lowercase);
        if bare.is_some_and(|b| SUPPORTED_EXTENSIONS.contains(&b.as_str())) {
            return Err(AppError::InvalidArgument(format!(
                "\"{}\" has no file name before the extension",
                name
            )));
        }
    }

    match path.extension().and_then(|e| e.to_str()) {
        None => {
            path.set_extension(DEFAULT_EXTENSION);
        }
        Some(ext) => {
            let ext = ext.to_lowercase();
            if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(AppError::InvalidArgument(format!(
                    "Unsupported file type \".{}\" (use one of: {})",
                    ext,
                    SUPPORTED_EXTENSIONS.join(", ")
                )));
            }
        }
    }

    if path.exists() {
        return Err(AppError::InvalidArgument(format!(
            "File already exists: {}",
            path.display()
        )));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.frames_per_second, 30);
        assert_eq!(settings.delay_seconds, 0.5);
        assert_eq!(settings.encoding_preset, EncodingPreset::High);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "ffmpeg_path = \"/opt/ffmpeg/bin/ffmpeg\"\nencoding_preset = \"1280x720\"\ncapture_audio = false\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(settings.encoding_preset, EncodingPreset::Hd720);
        assert!(!settings.capture_audio);
        assert_eq!(settings.video_codec, "libx264");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "frames_per_second = \"fast\"\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(AppError::Config(_))));

        fs::write(&path, "encoding_preset = \"Ultra\"\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(AppError::Config(_))));

        fs::write(&path, "frames_per_second = 0\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_default_filename_format() {
        let name = default_generated_filename();
        assert!(name.starts_with("videosnap-"));
        assert!(name.ends_with(".mov"));
        assert!(name.contains("-at-"));
        // videosnap-YYYY-MM-DD-at-HH.MM.SS.mov
        assert_eq!(name.len(), "videosnap-2024-01-31-at-09.05.07.mov".len());
    }

    #[test]
    fn test_output_path_without_extension_gets_mov() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_output_path(&dir.path().join("movie")).unwrap();
        assert_eq!(path, dir.path().join("movie.mov"));
    }

    #[test]
    fn test_output_path_extensions() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_output_path(&dir.path().join("movie.mp4")).is_ok());
        assert!(resolve_output_path(&dir.path().join("movie.MKV")).is_ok());
        assert!(matches!(
            resolve_output_path(&dir.path().join("movie.avi")),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_extension_without_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolve_output_path(&dir.path().join(".mov")),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(resolve_output_path(&dir.path().join(".MP4")).is_err());
        // Other dot-files are ordinary names
        assert_eq!(
            resolve_output_path(&dir.path().join(".take1")).unwrap(),
            dir.path().join(".take1.mov")
        );
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "delay_seconds = 1e30\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_existing_output_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("movie.mov");
        fs::write(&existing, b"keep me").unwrap();

        assert!(resolve_output_path(&existing).is_err());
        assert!(resolve_output_path(&dir.path().join("movie")).is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");
    }
}
