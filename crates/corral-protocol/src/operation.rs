//! Operation codes carried by every envelope.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Closed set of operations a request can ask for or a response can answer.
///
/// The textual form (`remove_first`, `login`, ...) is shared by the wire
/// encoding, log fields, and the client's command names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Collection summary for the acting user.
    Info,
    /// Remove the acting user's largest record.
    RemoveFirst,
    /// Remove the acting user's smallest record.
    RemoveLast,
    /// Insert one record.
    Add,
    /// Remove every record equal in content to the supplied one.
    Remove,
    /// List the acting user's records in natural order.
    Show,
    /// Insert every record from an uploaded document.
    Import,
    /// Reload the collection.
    Load,
    /// Persist the collection.
    Save,
    /// Ask the server to stop its receive loop.
    Stop,
    /// Create an account and deliver its secret out of band.
    Register,
    /// Check a login/credential pair.
    Login,
}

impl Operation {
    /// Returns the canonical lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Whether requests for this operation may be sent without credentials.
    #[must_use]
    pub const fn is_anonymous(self) -> bool {
        matches!(self, Self::Register | Self::Login)
    }
}
