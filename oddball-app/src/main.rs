mod app;
mod audio;
mod cli;
mod headless;
mod logging;
mod runner;
mod scanner;

use std::process::ExitCode;

use clap::Parser;
use oddball_experiment::TaskError;
use tracing::{error, warn};

use crate::cli::Cli;

/// Exit status when the operator quits mid-session.
const EXIT_ABORTED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match runner::run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<TaskError>() {
            Some(TaskError::Aborted) => {
                warn!("session aborted by operator");
                ExitCode::from(EXIT_ABORTED)
            }
            _ => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        },
    }
}
