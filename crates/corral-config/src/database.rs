//! Database location given on the server command line.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Where the server keeps users and records.
///
/// `memory:` keeps everything in process; `file:<path>` loads and persists a
/// JSON snapshot at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUri {
    /// Volatile in-process storage.
    Memory,
    /// JSON snapshot on disk.
    File {
        /// Snapshot location.
        path: Utf8PathBuf,
    },
}

impl DatabaseUri {
    /// Builds a file-backed location.
    #[must_use]
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        Self::File { path: path.into() }
    }
}

impl fmt::Display for DatabaseUri {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => formatter.write_str("memory:"),
            Self::File { path } => write!(formatter, "file:{path}"),
        }
    }
}

impl FromStr for DatabaseUri {
    type Err = DatabaseUriError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((scheme, rest)) = input.split_once(':') else {
            return Err(DatabaseUriError::MissingScheme(input.to_owned()));
        };
        match scheme.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => {
                let path = rest.strip_prefix("//").unwrap_or(rest);
                if path.is_empty() {
                    return Err(DatabaseUriError::MissingPath(input.to_owned()));
                }
                Ok(Self::file(path))
            }
            _ => Err(DatabaseUriError::UnsupportedScheme(scheme.to_owned())),
        }
    }
}

/// Errors encountered while parsing a [`DatabaseUri`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseUriError {
    /// No `scheme:` prefix.
    #[error("database uri '{0}' has no scheme; expected memory: or file:<path>")]
    MissingScheme(String),
    /// Scheme not recognised.
    #[error("unsupported database scheme '{0}'")]
    UnsupportedScheme(String),
    /// `file:` without a path.
    #[error("missing file path in '{0}'")]
    MissingPath(String),
}
