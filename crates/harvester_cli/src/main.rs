use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_debug;

mod cli;
mod config;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = engine_logging::level_for_verbosity(cli.verbose, cli.quiet);
    if let Err(err) = engine_logging::initialize(level, cli.log_file.as_deref()) {
        eprintln!("harvest: could not open log file: {err}");
    }
    engine_debug!("arguments: {:?}", cli);

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("harvest error: {err:#}");
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
