mod cli;
mod config;
mod curation_log;
mod database;
mod error;
mod filter;
mod job;
mod preload;
mod progress;
mod status;
mod update;

use cli::Cli;
use error::SeqStatusError;
use log::error;
use progress::{ProgressReporter, StdoutProgress};

const EXIT_FAILURE: i32 = 1;

fn main() {
    let result = Cli::handle_command_line();
    if let Some(code) = exit_code(result, &mut StdoutProgress) {
        std::process::exit(code);
    }
}

/// Reports a fatal error to the operator and returns the exit code for it.
fn exit_code(
    result: Result<(), SeqStatusError>,
    out: &mut dyn ProgressReporter,
) -> Option<i32> {
    match result {
        Ok(()) => None,
        Err(err) => {
            error!("{:?}", err);
            out.message(&err.to_string());
            Some(EXIT_FAILURE)
        }
    }
}
