//! Signal-driven shutdown.

use std::io;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::dispatch::Services;

pub(crate) const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Clears the run flag on the first SIGINT or SIGTERM.
///
/// The watcher thread is detached; it ends with the process.
///
/// # Errors
///
/// Fails when handlers cannot be registered or the thread cannot start.
pub fn watch_signals(services: Arc<Services>) -> Result<(), ShutdownError> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).map_err(|source| ShutdownError::Install { source })?;
    thread::Builder::new()
        .name(String::from("corrald-signals"))
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
                services.request_shutdown("signal");
            }
        })
        .map(|_| ())
        .map_err(|source| ShutdownError::Install { source })
}
