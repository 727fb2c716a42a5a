//! User and record storage.
//!
//! The dispatch handlers only see the [`Database`] trait. Two backends are
//! provided: [`MemoryDatabase`] for `memory:` and [`JsonFileDatabase`] for
//! `file:<path>`, which persists a JSON snapshot after every mutation. Both
//! share the same in-memory snapshot logic behind a mutex, so handlers
//! running on separate threads need no extra locking.

mod errors;
mod file;
mod memory;
mod snapshot;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use corral_config::DatabaseUri;
use corral_protocol::{CollectionInfo, Record};

pub use self::errors::StorageError;
pub use self::file::JsonFileDatabase;
pub use self::memory::MemoryDatabase;
pub(crate) use self::snapshot::Snapshot;

const STORAGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::storage");

/// Identifier assigned to a user at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// Storage contract used by the request handlers.
///
/// Every record operation is scoped to one user. Implementations must be
/// safe to call from many worker threads at once.
pub trait Database: Send + Sync {
    /// Records owned by `user`, in storage order.
    fn list_records(&self, user: UserId) -> Result<Vec<Record>, StorageError>;

    /// Creation time of the collection and the number of records `user` owns.
    fn collection_info(&self, user: UserId) -> Result<CollectionInfo, StorageError>;

    /// Stores `record` for `user`.
    fn add_record(&self, record: Record, user: UserId) -> Result<(), StorageError>;

    /// Deletes every record of `user` equal in content to `record`, returning
    /// how many were removed.
    fn remove_record(&self, record: &Record, user: UserId) -> Result<usize, StorageError>;

    /// Deletes the largest record of `user`.
    fn remove_first(&self, user: UserId) -> Result<Option<Record>, StorageError>;

    /// Deletes the smallest record of `user`.
    fn remove_last(&self, user: UserId) -> Result<Option<Record>, StorageError>;

    /// Creates an account for `login`, returning its id.
    ///
    /// An existing account is never touched; registering its login again
    /// fails with [`StorageError::AlreadyRegistered`].
    fn register_user(&self, login: &str, digest: &str) -> Result<UserId, StorageError>;

    /// Whether `login` has an account.
    fn is_registered(&self, login: &str) -> Result<bool, StorageError>;

    /// Whether `digest` is the stored digest for `login`.
    fn verify_user(&self, login: &str, digest: &str) -> Result<bool, StorageError> {
        self.resolve_user_id(login, digest).map(|user| user.is_some())
    }

    /// The id of `login` when `digest` matches.
    fn resolve_user_id(&self, login: &str, digest: &str) -> Result<Option<UserId>, StorageError>;
}

/// Opens the database named by `uri` on behalf of `database_user`.
///
/// # Errors
///
/// Fails when a file snapshot exists but cannot be read or parsed.
pub fn open(uri: &DatabaseUri, database_user: &str) -> Result<Arc<dyn Database>, StorageError> {
    info!(
        target: STORAGE_TARGET,
        database = %uri,
        database_user,
        "opening database"
    );
    match uri {
        DatabaseUri::Memory => Ok(Arc::new(MemoryDatabase::new())),
        DatabaseUri::File { path } => Ok(Arc::new(JsonFileDatabase::open(path.clone())?)),
    }
}
