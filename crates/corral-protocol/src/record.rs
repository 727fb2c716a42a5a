//! Records stored in the shared collection and the summary returned by `info`.

use std::cmp::Ordering;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Planar position of a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// One element of a user's collection.
///
/// Records are entered as JSON literals:
///
/// ```json
/// {"name":"crate","size":2.5,"position":{"x":1.0,"y":-3.0}}
/// ```
///
/// `created_at` is optional in literals and defaults to the moment of parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display name; also the primary ordering key.
    pub name: String,
    /// Size used by `remove_first` / `remove_last`.
    pub size: f64,
    /// Where the record sits.
    pub position: Position,
    /// When the record was created.
    #[serde(default = "SystemTime::now")]
    pub created_at: SystemTime,
}

/// Errors raised while reading record literals.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The literal is not valid JSON for a record.
    #[error("could not parse record literal: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The name is empty or whitespace.
    #[error("record name must not be empty")]
    EmptyName,
    /// A numeric field is NaN or infinite.
    #[error("record field '{field}' must be a finite number")]
    NonFinite {
        /// Offending field.
        field: &'static str,
    },
}

impl Record {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, size: f64, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            size,
            position: Position { x, y },
            created_at: SystemTime::now(),
        }
    }

    /// Parses and validates a single JSON record literal.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the text is not a record or a field is
    /// out of range.
    pub fn from_literal(text: &str) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_str(text.trim())?;
        record.validate()?;
        Ok(record)
    }

    /// Parses a JSON array of record literals, as uploaded by `import`.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed or invalid record.
    pub fn from_document(text: &str) -> Result<Vec<Self>, RecordError> {
        let records: Vec<Self> = serde_json::from_str(text.trim())?;
        for record in &records {
            record.validate()?;
        }
        Ok(records)
    }

    /// Checks the field constraints shared by all entry points.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyName`] or [`RecordError::NonFinite`].
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }
        for (field, value) in [
            ("size", self.size),
            ("position.x", self.position.x),
            ("position.y", self.position.y),
        ] {
            if !value.is_finite() {
                return Err(RecordError::NonFinite { field });
            }
        }
        Ok(())
    }

    /// Natural ordering: name, then size, then position.
    #[must_use]
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.size.total_cmp(&other.size))
            .then_with(|| self.position.x.total_cmp(&other.position.x))
            .then_with(|| self.position.y.total_cmp(&other.position.y))
    }

    /// Equality over the user-supplied fields, ignoring `created_at`.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size && self.position == other.position
    }
}

/// Sorts records into their natural order in place.
pub fn sort_natural(records: &mut [Record]) {
    records.sort_by(Record::natural_cmp);
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (size {}) at ({}, {}), created {}",
            self.name,
            self.size,
            self.position.x,
            self.position.y,
            format_timestamp(self.created_at)
        )
    }
}

/// Summary of a user's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Creation time of the collection.
    pub created_at: SystemTime,
    /// Number of records the user owns.
    pub count: usize,
}

impl fmt::Display for CollectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, records: {}",
            format_timestamp(self.created_at),
            self.count
        )
    }
}

fn format_timestamp(moment: SystemTime) -> String {
    OffsetDateTime::from(moment)
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("unknown"))
}
