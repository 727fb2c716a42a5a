//! Out-of-band delivery of generated secrets.

mod address;
mod spool;

use std::io;

use thiserror::Error;

pub use self::address::is_valid_address;
pub use self::spool::SpoolNotifier;

const NOTIFY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::notify");

/// Errors raised while delivering a secret.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The address is not a mailbox.
    #[error("'{0}' is not a valid mailbox address")]
    InvalidAddress(String),
    /// The delivery transport failed.
    #[error("failed to deliver to {address}: {source}")]
    Delivery {
        /// Intended recipient.
        address: String,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },
}

/// Sends a secret to a mailbox address.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Delivers `secret` to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidAddress`] for malformed addresses and
    /// [`NotifyError::Delivery`] when the transport fails.
    fn deliver(&self, address: &str, secret: &str) -> Result<(), NotifyError>;
}
