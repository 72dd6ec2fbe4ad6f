//! VideoSnap - record video and audio from attached capture devices.
//!
//! Device discovery, the ffmpeg-driven capture session and the command-line
//! actions built on them.

pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod encode;
pub mod recorder;
pub mod signals;
pub mod utils;

use anyhow::Context;
use cli::Args;
use config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utils::error::EXIT_SUCCESS;

/// Initialize logging to stderr; `RUST_LOG` overrides the verbosity flag
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "videosnap=debug" } else { "videosnap=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the action the arguments ask for and return the exit code
pub async fn run(args: &Args) -> anyhow::Result<u8> {
    if args.verbose {
        println!("{}", commands::system::describe());
    }

    let settings = Settings::load().context("Failed to load settings")?;
    tracing::debug!("Settings: {:?}", settings);

    if args.list {
        commands::devices::list(&settings, args.json)
            .await
            .context("Failed to list devices")?;
        return Ok(EXIT_SUCCESS);
    }

    let outcome = commands::recording::record(args, &settings)
        .await
        .map_err(|e| {
            tracing::debug!("Recording failed with {}", e.code());
            e
        })
        .context("Recording failed")?;

    Ok(outcome.exit_code())
}
