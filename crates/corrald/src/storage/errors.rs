//! Error types for storage backends.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced by [`Database`](super::Database) implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The login already has an account.
    #[error("{0} is already registered")]
    AlreadyRegistered(String),
    /// A thread panicked while holding the storage lock.
    #[error("storage lock poisoned")]
    Poisoned,
    /// The snapshot file could not be read.
    #[error("failed to read database snapshot {path}: {source}")]
    Read {
        /// Snapshot location.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The snapshot file is not valid JSON.
    #[error("database snapshot {path} is corrupt: {source}")]
    Corrupt {
        /// Snapshot location.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the snapshot failed.
    #[error("failed to persist database snapshot {path}: {source}")]
    Persist {
        /// Snapshot location.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
