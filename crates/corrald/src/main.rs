//! Entry point for the `corrald` server.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use corrald::{StructuredHealthReporter, SystemConfigLoader};

fn main() -> ExitCode {
    // Unlocked: worker threads log to stderr while `run` blocks.
    let mut stderr = io::stderr();
    corrald::run(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &mut stderr,
    )
}
