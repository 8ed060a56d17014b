//! Shared `main()` body for the `pysetup` binary.

use std::process::ExitCode;

use clap::Parser;

use crate::logging::init_logging;
use crate::progress;

use super::command::Cli;
use super::dispatch::dispatch;

/// Parse arguments, install logging and run the chosen subcommand.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.global.log_level, cli.global.log_file.as_deref()) {
        progress::error(&format!("{err:#}"));
        return ExitCode::from(2);
    }

    match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            progress::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
