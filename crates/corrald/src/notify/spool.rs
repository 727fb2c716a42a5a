//! Notifier that drops each secret into a spool directory.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use super::{NOTIFY_TARGET, NotifyError, Notifier, is_valid_address};

/// Writes `<spool>/<address>.secret` for every delivery.
///
/// A local mail agent (or the operator) picks the files up from there.
#[derive(Debug, Clone)]
pub struct SpoolNotifier {
    directory: Utf8PathBuf,
}

impl SpoolNotifier {
    /// Spools into `directory`, created on first delivery.
    #[must_use]
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Spool directory.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// File a delivery to `address` is written to.
    #[must_use]
    pub fn message_path(&self, address: &str) -> Utf8PathBuf {
        self.directory.join(format!("{address}.secret"))
    }
}

impl Notifier for SpoolNotifier {
    fn deliver(&self, address: &str, secret: &str) -> Result<(), NotifyError> {
        if !is_valid_address(address) {
            return Err(NotifyError::InvalidAddress(address.to_owned()));
        }
        let delivery_error = |source| NotifyError::Delivery {
            address: address.to_owned(),
            source,
        };
        fs::create_dir_all(&self.directory).map_err(delivery_error)?;
        let path = self.message_path(address);
        fs::write(&path, format!("{secret}\n")).map_err(delivery_error)?;
        info!(
            target: NOTIFY_TARGET,
            address,
            path = %path,
            "secret spooled"
        );
        Ok(())
    }
}
