//! Plain data shared by both storage backends.

use std::cmp::Ordering;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use corral_protocol::{CollectionInfo, Record};

use super::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Account {
    id: UserId,
    login: String,
    digest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OwnedRecord {
    owner: UserId,
    record: Record,
}

/// Whole database state; also the on-disk format of `file:` databases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    created_at: SystemTime,
    next_user: u64,
    accounts: Vec<Account>,
    records: Vec<OwnedRecord>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            created_at: SystemTime::now(),
            next_user: 1,
            accounts: Vec::new(),
            records: Vec::new(),
        }
    }
}

impl Snapshot {
    pub(crate) fn list_records(&self, user: UserId) -> Vec<Record> {
        self.owned_by(user).cloned().collect()
    }

    pub(crate) fn collection_info(&self, user: UserId) -> CollectionInfo {
        CollectionInfo {
            created_at: self.created_at,
            count: self.owned_by(user).count(),
        }
    }

    pub(crate) fn add_record(&mut self, record: Record, owner: UserId) {
        self.records.push(OwnedRecord { owner, record });
    }

    pub(crate) fn remove_record(&mut self, record: &Record, user: UserId) -> usize {
        let before = self.records.len();
        self.records
            .retain(|owned| owned.owner != user || !owned.record.same_content(record));
        before - self.records.len()
    }

    pub(crate) fn remove_largest(&mut self, user: UserId) -> Option<Record> {
        self.remove_extreme(user, Ordering::Greater)
    }

    pub(crate) fn remove_smallest(&mut self, user: UserId) -> Option<Record> {
        self.remove_extreme(user, Ordering::Less)
    }

    pub(crate) fn is_registered(&self, login: &str) -> bool {
        self.accounts.iter().any(|account| account.login == login)
    }

    /// Creates an account for `login`; `None` when the login is taken.
    pub(crate) fn register(&mut self, login: &str, digest: &str) -> Option<UserId> {
        if self.is_registered(login) {
            return None;
        }
        let id = UserId::new(self.next_user);
        self.next_user += 1;
        self.accounts.push(Account {
            id,
            login: login.to_owned(),
            digest: digest.to_owned(),
        });
        Some(id)
    }

    pub(crate) fn resolve(&self, login: &str, digest: &str) -> Option<UserId> {
        self.accounts
            .iter()
            .find(|account| account.login == login && account.digest == digest)
            .map(|account| account.id)
    }

    fn owned_by(&self, user: UserId) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(move |owned| owned.owner == user)
            .map(|owned| &owned.record)
    }

    /// Removes the first record of `user` whose size compares as `wanted`
    /// against every other candidate.
    fn remove_extreme(&mut self, user: UserId, wanted: Ordering) -> Option<Record> {
        let mut best: Option<(usize, f64)> = None;
        for (index, owned) in self.records.iter().enumerate() {
            if owned.owner != user {
                continue;
            }
            let size = owned.record.size;
            let better = match best {
                None => true,
                Some((_, current)) => size.total_cmp(&current) == wanted,
            };
            if better {
                best = Some((index, size));
            }
        }
        best.map(|(index, _)| self.records.remove(index).record)
    }
}
