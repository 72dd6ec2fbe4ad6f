//! Command-line arguments

use crate::config::{DEFAULT_ENCODING_PRESET, DEFAULT_RECORDING_DELAY, MAX_SECONDS};
use crate::encode::EncodingPreset;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Record video and audio from a capture device to a movie file
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "videosnap", version)]
#[command(
    long_about = "Record video and audio from a capture device to a movie file.\n\
        Recording stops after the duration given with -t, or on Ctrl+C.\n\
        Press Ctrl+Z to pause and resume."
)]
pub struct Args {
    /// List attached capture devices
    #[arg(short, long)]
    pub list: bool,

    /// Recording duration in seconds (fractions allowed)
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_duration)]
    pub duration: Option<f64>,

    /// Delay before capturing starts, in seconds [default: 0.5]
    #[arg(short = 'w', long, value_name = "SECONDS", value_parser = parse_delay)]
    pub delay: Option<f64>,

    /// Record from the device with this name
    #[arg(short, long, value_name = "NAME")]
    pub device: Option<String>,

    /// Encoding preset (see below) [default: High]
    #[arg(short, long, value_name = "PRESET")]
    pub preset: Option<EncodingPreset>,

    /// Do not capture audio
    #[arg(long)]
    pub no_audio: bool,

    /// Print the device list as JSON (with --list)
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Verbose diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Output movie file [default: videosnap-<date>-at-<time>.mov]
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl Args {
    /// Parse `std::env::args_os()`
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse_from_args(std::env::args_os())
    }

    /// Parse the given arguments, the first one being the program name
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }
}

/// The clap command, with the preset list appended to the help text
pub fn command() -> clap::Command {
    Args::command().after_help(help_footer())
}

/// Help text printed by `-h`
pub fn print_help() {
    // Only fails when stdout is gone
    let _ = command().print_help();
}

fn help_footer() -> String {
    format!(
        "Encoding presets (default {}):\n  {}\n\n\
         Defaults: delay {}s, audio captured from the device or the default input.\n\n\
         Examples:\n  \
         videosnap -l\n  \
         videosnap -t 5.75 -d 'FaceTime HD Camera' -p 1280x720 movie.mov\n  \
         videosnap --no-audio -w 3 recording",
        DEFAULT_ENCODING_PRESET,
        EncodingPreset::names(),
        DEFAULT_RECORDING_DELAY
    )
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("\"{}\" is not a number of seconds", value))?;
    if !seconds.is_finite() {
        return Err(format!("\"{}\" is not a finite number of seconds", value));
    }
    if seconds < 0.0 {
        return Err("must not be negative".to_string());
    }
    if seconds > MAX_SECONDS {
        return Err(format!("must be at most {} seconds", MAX_SECONDS));
    }
    Ok(seconds)
}

fn parse_duration(value: &str) -> Result<f64, String> {
    let seconds = parse_seconds(value)?;
    if seconds == 0.0 {
        return Err("must be greater than zero".to_string());
    }
    Ok(seconds)
}

fn parse_delay(value: &str) -> Result<f64, String> {
    parse_seconds(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from_args(std::iter::once("videosnap").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn test_no_arguments() {
        let args = parse(&[]).unwrap();
        assert!(!args.list);
        assert_eq!(args.duration, None);
        assert_eq!(args.delay, None);
        assert_eq!(args.preset, None);
        assert_eq!(args.file, None);
    }

    #[test]
    fn test_full_recording_arguments() {
        let args = parse(&[
            "-t", "5.75", "-w", "2", "-d", "FaceTime HD Camera", "-p", "1280x720", "--no-audio", "-v",
            "movie.mov",
        ])
        .unwrap();

        assert_eq!(args.duration, Some(5.75));
        assert_eq!(args.delay, Some(2.0));
        assert_eq!(args.device.as_deref(), Some("FaceTime HD Camera"));
        assert_eq!(args.preset, Some(EncodingPreset::Hd720));
        assert!(args.no_audio);
        assert!(args.verbose);
        assert_eq!(args.file, Some(PathBuf::from("movie.mov")));
    }

    #[test]
    fn test_preset_is_case_insensitive() {
        assert_eq!(parse(&["-p", "medium"]).unwrap().preset, Some(EncodingPreset::Medium));
        assert!(parse(&["-p", "Ultra"]).is_err());
    }

    #[test]
    fn test_invalid_durations() {
        assert!(parse(&["-t", "-1"]).is_err());
        assert!(parse(&["-t", "0"]).is_err());
        assert!(parse(&["-t", "inf"]).is_err());
        assert!(parse(&["-t", "NaN"]).is_err());
        assert!(parse(&["-t", "ten"]).is_err());
    }

    #[test]
    fn test_oversized_seconds_are_rejected() {
        assert!(parse(&["-w", "1e30"]).is_err());
        assert!(parse(&["-t", "1e30"]).is_err());
        assert_eq!(parse(&["-t", "3600"]).unwrap().duration, Some(3600.0));
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        assert_eq!(parse(&["-w", "0"]).unwrap().delay, Some(0.0));
        assert!(parse(&["-w", "-0.5"]).is_err());
    }

    #[test]
    fn test_json_requires_list() {
        assert!(parse(&["--json"]).is_err());
        let args = parse(&["-l", "--json"]).unwrap();
        assert!(args.list && args.json);
    }

    #[test]
    fn test_help_lists_presets() {
        let help = command().render_help().to_string();
        assert!(help.contains("Low, Medium, High, 640x480, 960x540, 1280x720, 1920x1080, 3840x2160"));
        assert!(help.contains("--no-audio"));
    }

    #[test]
    fn test_help_and_version_are_not_failures() {
        let err = parse(&["-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = parse(&["-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
