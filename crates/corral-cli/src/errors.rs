//! Error types for the client runtime.

use std::io;

use corral_protocol::{Operation, RecordError, TransportError};
use thiserror::Error;

use crate::console::CommandName;

/// Failures raised while running a command.
///
/// Everything except [`CliError::ReadInput`] and [`CliError::WriteOutput`]
/// aborts only the command that raised it; the console keeps reading.
#[derive(Debug, Error)]
pub enum CliError {
    /// The text does not name a command in the active table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// A command was entered without its argument.
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// Command that was entered.
        command: CommandName,
        /// What was expected after it.
        argument: &'static str,
    },
    /// A record literal or import document did not parse.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
    /// The import file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadImport {
        /// Path as entered.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Input ended while waiting for the secret.
    #[error("no secret entered")]
    MissingSecret,
    /// An authenticated operation was attempted without credentials.
    #[error("`{0}` requires a login")]
    LoginRequired(Operation),
    /// The request could not be sent or the reply not received.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server did not answer within the timeout.
    #[error("no response to `{0}` from the server")]
    NoResponse(Operation),
    /// The server answered with a body the command cannot render.
    #[error("unexpected `{found}` reply to `{operation}`")]
    UnexpectedReply {
        /// Operation the reply answered.
        operation: Operation,
        /// Kind of body that arrived.
        found: &'static str,
    },
    /// The server refused the registration.
    #[error("registration failed for {0}")]
    RegistrationRefused(String),
    /// The server refused the login/secret pair.
    #[error("login refused for {0}")]
    LoginRefused(String),
    /// Reading the next line of input failed.
    #[error("failed to read input: {0}")]
    ReadInput(#[source] io::Error),
    /// Writing to stdout or stderr failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}

impl CliError {
    /// Whether the console must stop after reporting this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ReadInput(_) | Self::WriteOutput(_))
    }
}
