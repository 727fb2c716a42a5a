//! Structured telemetry initialisation for the server.
//!
//! Every corrald module logs under its own target, such as
//! `corrald::dispatch` or `corrald::storage`, so `--log-filter` can single
//! out one subsystem. Logs go to stderr as compact text or flattened JSON.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use corral_config::{LogFormat, ServerArgs};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The `--log-filter` expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching global
/// state, so tests may bootstrap several servers in one process. The filter
/// and format of the first call stay in force.
///
/// # Examples
///
/// ```rust
/// use corral_config::{DatabaseUri, ServerArgs};
/// use corrald::telemetry;
///
/// # fn main() -> Result<(), corrald::telemetry::TelemetryError> {
/// let args = ServerArgs::new(4000, DatabaseUri::Memory, "admin");
/// let first = telemetry::initialise(&args)?;
///
/// // A second server in the same process reuses the installed subscriber.
/// let second = telemetry::initialise(&ServerArgs::new(4001, DatabaseUri::Memory, "admin"))?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the filter expression is invalid or a foreign subscriber was
/// installed first.
pub fn initialise(args: &ServerArgs) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(args.log_filter(), args.log_format()))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(filter: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
