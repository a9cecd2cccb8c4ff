//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use sensitivity_cli::CliError;

fn main() {
    match sensitivity_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("sensitivity: {err}");
            std::process::exit(1);
        }
    }
}
