//! CLI entrypoint for the corral client.
//!
//! Delegates to [`corral_cli::run`] with the process arguments and standard
//! streams.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    corral_cli::run(std::env::args_os(), io::stdin().lock(), &mut stdout, &mut stderr)
}
