//! Configuration shared by the corral server (`corrald`) and client
//! (`corral`).
//!
//! Both binaries are configured entirely from their command lines. The
//! [`ServerArgs`] and [`ClientArgs`] parsers validate ports through
//! [`parse_port`], and the server's database location is a [`DatabaseUri`].

mod args;
mod database;
pub mod defaults;
mod logging;
mod port;

pub use args::{ClientArgs, ServerArgs};
pub use database::{DatabaseUri, DatabaseUriError};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RECEIVE_TIMEOUT,
    default_mail_spool,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use port::{PortError, parse_port};
