//! Error types for request handlers.

use thiserror::Error;

use corral_protocol::{Operation, RecordError};

use crate::storage::StorageError;

/// Errors raised while handling a single request.
///
/// Handler errors never reach the client; they are logged and the request
/// gets no reply.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The body did not have the shape the operation needs.
    #[error("{operation} expects a {expected} body, got {found}")]
    UnexpectedBody {
        /// Operation being handled.
        operation: Operation,
        /// Expected payload kind.
        expected: &'static str,
        /// Received payload kind.
        found: &'static str,
    },
    /// A record failed validation or the import document did not parse.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
    /// The database failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    /// A handler that needs an acting user ran without one.
    #[error("{0} requires an authenticated user")]
    MissingUser(Operation),
}

impl HandlerError {
    /// Creates an unexpected body error.
    pub const fn unexpected_body(
        operation: Operation,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::UnexpectedBody {
            operation,
            expected,
            found,
        }
    }
}
