//! JSON snapshot storage for `file:<path>` databases.

use std::fs;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use corral_protocol::{CollectionInfo, Record};

use super::{Database, STORAGE_TARGET, Snapshot, StorageError, UserId};

/// Database persisted to a JSON file after every mutation.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the snapshot, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct JsonFileDatabase {
    path: Utf8PathBuf,
    state: Mutex<Snapshot>,
}

impl JsonFileDatabase {
    /// Loads `path`, starting empty when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub fn open(path: Utf8PathBuf) -> Result<Self, StorageError> {
        let snapshot = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    /// Location of the snapshot.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn state(&self) -> Result<MutexGuard<'_, Snapshot>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Applies `change` to a copy of the state and installs the copy only
    /// once it is on disk. The lock is held throughout, so snapshots are
    /// written in mutation order.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Snapshot) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut state = self.state()?;
        let mut staged = state.clone();
        let outcome = change(&mut staged)?;
        self.persist(&staged)?;
        *state = staged;
        Ok(outcome)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let persist_error = |source: io::Error| StorageError::Persist {
            path: self.path.clone(),
            source,
        };
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(directory).map_err(persist_error)?;

        let mut file = NamedTempFile::new_in(directory).map_err(persist_error)?;
        serde_json::to_writer_pretty(&mut file, snapshot)
            .map_err(|error| persist_error(io::Error::other(error)))?;
        file.flush().map_err(persist_error)?;
        file.persist(&self.path)
            .map_err(|error| persist_error(error.error))?;
        debug!(target: STORAGE_TARGET, path = %self.path, "database snapshot written");
        Ok(())
    }
}

impl Database for JsonFileDatabase {
    fn list_records(&self, user: UserId) -> Result<Vec<Record>, StorageError> {
        Ok(self.state()?.list_records(user))
    }

    fn collection_info(&self, user: UserId) -> Result<CollectionInfo, StorageError> {
        Ok(self.state()?.collection_info(user))
    }

    fn add_record(&self, record: Record, user: UserId) -> Result<(), StorageError> {
        self.mutate(|state| {
            state.add_record(record, user);
            Ok(())
        })
    }

    fn remove_record(&self, record: &Record, user: UserId) -> Result<usize, StorageError> {
        self.mutate(|state| Ok(state.remove_record(record, user)))
    }

    fn remove_first(&self, user: UserId) -> Result<Option<Record>, StorageError> {
        self.mutate(|state| Ok(state.remove_largest(user)))
    }

    fn remove_last(&self, user: UserId) -> Result<Option<Record>, StorageError> {
        self.mutate(|state| Ok(state.remove_smallest(user)))
    }

    fn register_user(&self, login: &str, digest: &str) -> Result<UserId, StorageError> {
        self.mutate(|state| {
            state
                .register(login, digest)
                .ok_or_else(|| StorageError::AlreadyRegistered(login.to_owned()))
        })
    }

    fn is_registered(&self, login: &str) -> Result<bool, StorageError> {
        Ok(self.state()?.is_registered(login))
    }

    fn resolve_user_id(&self, login: &str, digest: &str) -> Result<Option<UserId>, StorageError> {
        Ok(self.state()?.resolve(login, digest))
    }
}
