//! Volatile storage for `memory:` databases.

use std::sync::{Mutex, MutexGuard};

use corral_protocol::{CollectionInfo, Record};

use super::{Database, Snapshot, StorageError, UserId};

/// In-process database; contents vanish with the server.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: Mutex<Snapshot>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, Snapshot>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Database for MemoryDatabase {
    fn list_records(&self, user: UserId) -> Result<Vec<Record>, StorageError> {
        Ok(self.state()?.list_records(user))
    }

    fn collection_info(&self, user: UserId) -> Result<CollectionInfo, StorageError> {
        Ok(self.state()?.collection_info(user))
    }

    fn add_record(&self, record: Record, user: UserId) -> Result<(), StorageError> {
        self.state()?.add_record(record, user);
        Ok(())
    }

    fn remove_record(&self, record: &Record, user: UserId) -> Result<usize, StorageError> {
        Ok(self.state()?.remove_record(record, user))
    }

    fn remove_first(&self, user: UserId) -> Result<Option<Record>, StorageError> {
        Ok(self.state()?.remove_largest(user))
    }

    fn remove_last(&self, user: UserId) -> Result<Option<Record>, StorageError> {
        Ok(self.state()?.remove_smallest(user))
    }

    fn register_user(&self, login: &str, digest: &str) -> Result<UserId, StorageError> {
        self.state()?
            .register(login, digest)
            .ok_or_else(|| StorageError::AlreadyRegistered(login.to_owned()))
    }

    fn is_registered(&self, login: &str) -> Result<bool, StorageError> {
        Ok(self.state()?.is_registered(login))
    }

    fn resolve_user_id(&self, login: &str, digest: &str) -> Result<Option<UserId>, StorageError> {
        Ok(self.state()?.resolve(login, digest))
    }
}
