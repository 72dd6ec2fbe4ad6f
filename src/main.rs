use clap::error::ErrorKind;
use std::process::ExitCode;
use videosnap::cli::{self, Args};
use videosnap::utils::error::{EXIT_FAILURE, EXIT_SUCCESS};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            return match e.kind() {
                ErrorKind::DisplayHelp => {
                    cli::print_help();
                    ExitCode::from(EXIT_SUCCESS)
                }
                ErrorKind::DisplayVersion => {
                    let _ = e.print();
                    ExitCode::from(EXIT_SUCCESS)
                }
                _ => {
                    let _ = e.print();
                    ExitCode::from(EXIT_FAILURE)
                }
            };
        }
    };

    videosnap::init_tracing(args.verbose);

    match videosnap::run(&args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
