//! AutoCrew CLI entry point
//!
//! Parses the command line, runs the requested workflow and maps the
//! result to the process exit code. See [`autocrew::cli`] for the flags.

use autocrew::cli;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    cli::run(std::env::args_os()).await
}
