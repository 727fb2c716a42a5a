//! Server for per-user record collections over UDP.
//!
//! `corrald <port> <database-uri> <database-user>` binds one UDP socket and
//! answers [`Envelope`](corral_protocol::Envelope) requests from `corral`
//! clients. Every authenticated request carries the user's login and secret
//! digest, which are checked against storage on each datagram; the server
//! keeps no sessions.
//!
//! The bootstrap sequence mirrors the rest of the workspace:
//!
//! 1. parse the command line ([`ConfigLoader`]);
//! 2. install structured telemetry on stderr ([`telemetry`]);
//! 3. open the database named by the URI ([`storage::open`]);
//! 4. bind the socket and start the receive loop ([`Server::start`]).
//!
//! Lifecycle events are reported through a [`HealthReporter`] so operators
//! (and tests) can observe each stage. A `stop` request or SIGINT/SIGTERM
//! clears the shared run flag; the loop finishes in-flight requests and
//! exits.

mod bootstrap;
pub mod dispatch;
mod health;
pub mod notify;
mod shutdown;
pub mod storage;
pub mod telemetry;
mod transport;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

pub use bootstrap::{
    ArgsConfigLoader, BootstrapError, ConfigLoader, RunningServer, Server, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use shutdown::{ShutdownError, watch_signals};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{DatagramListener, ListenerError, ListenerHandle};

/// Runs the server until it is stopped, writing fatal errors to `stderr`.
#[must_use]
pub fn run<E: Write>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    stderr: &mut E,
) -> ExitCode {
    let server = match bootstrap_with(loader, reporter) {
        Ok(server) => server,
        Err(BootstrapError::Configuration { source }) => return usage(&source, stderr),
        Err(error) => {
            let _ = writeln!(stderr, "corrald: {error}");
            return ExitCode::FAILURE;
        }
    };

    let running = match server.start() {
        Ok(running) => running,
        Err(error) => {
            let _ = writeln!(stderr, "corrald: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = watch_signals(Arc::clone(running.services())) {
        tracing::warn!(
            target: shutdown::SHUTDOWN_TARGET,
            error = %error,
            "continuing without signal handling"
        );
    }

    match running.wait() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "corrald: {error}");
            ExitCode::FAILURE
        }
    }
}

fn usage<E: Write>(error: &clap::Error, stderr: &mut E) -> ExitCode {
    if error.use_stderr() {
        let _ = write!(stderr, "{}", error.render());
        ExitCode::FAILURE
    } else {
        let _ = write!(io::stdout(), "{}", error.render());
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests;
