//! Command-line models for `corrald` and `corral`.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;

use crate::database::DatabaseUri;
use crate::defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RECEIVE_TIMEOUT,
    default_mail_spool,
};
use crate::logging::LogFormat;
use crate::port::parse_port;

/// Server command line.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "corrald",
    version,
    about = "Serve per-user record collections over UDP",
    override_usage = "corrald <PORT> <DATABASE_URI> <DATABASE_USER> [OPTIONS]"
)]
pub struct ServerArgs {
    /// UDP port to listen on (1024-65535).
    #[arg(value_parser = parse_port)]
    pub port: u16,
    /// `memory:` or `file:<path>`.
    pub database_uri: DatabaseUri,
    /// Account name reported when opening the database.
    pub database_user: String,
    /// Tracing filter expression.
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format.
    #[arg(long, default_value_t = DEFAULT_LOG_FORMAT)]
    pub log_format: LogFormat,
    /// Directory receiving delivered secrets.
    #[arg(long)]
    pub mail_spool: Option<Utf8PathBuf>,
    /// Requests handled concurrently before new datagrams are dropped.
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT, value_parser = parse_max_in_flight)]
    pub max_in_flight: usize,
}

impl ServerArgs {
    /// Minimal configuration with every flag at its default.
    #[must_use]
    pub fn new(port: u16, database_uri: DatabaseUri, database_user: impl Into<String>) -> Self {
        Self {
            port,
            database_uri,
            database_user: database_user.into(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: DEFAULT_LOG_FORMAT,
            mail_spool: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Spool directory, falling back to the per-user default.
    #[must_use]
    pub fn mail_spool(&self) -> Utf8PathBuf {
        self.mail_spool.clone().unwrap_or_else(default_mail_spool)
    }
}

/// Client command line.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "corral",
    version,
    about = "Interactive client for a corral server",
    override_usage = "corral <ADDRESS> <PORT> [OPTIONS]"
)]
pub struct ClientArgs {
    /// Server host name or IP address.
    pub address: String,
    /// Server UDP port (1024-65535).
    #[arg(value_parser = parse_port)]
    pub port: u16,
    /// Milliseconds to wait for each response.
    #[arg(long, default_value_t = duration_millis(DEFAULT_RECEIVE_TIMEOUT))]
    pub timeout_ms: u64,
}

impl ClientArgs {
    /// Response timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_max_in_flight(text: &str) -> Result<usize, String> {
    match text.trim().parse::<usize>() {
        Ok(0) => Err(String::from("must be at least 1")),
        Ok(value) => Ok(value),
        Err(error) => Err(error.to_string()),
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
