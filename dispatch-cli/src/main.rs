//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use dispatch_cli::{CliError, run, write_error};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            let mut stdout = std::io::stdout().lock();
            if write_error(&mut stdout, &err).is_err() {
                eprintln!("dispatch: {err}");
            }
            ExitCode::FAILURE
        }
    }
}
