//! Port validation shared by both binaries.

use thiserror::Error;

use crate::defaults::MIN_PORT;

/// Errors raised when a port argument is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The text is not an integer.
    #[error("port '{0}' is not a number")]
    NotANumber(String),
    /// The integer is outside the unprivileged range.
    #[error("port {0} is outside the range 1024..=65535")]
    OutOfRange(i64),
}

/// Parses a port in `[1024, 65535]`; used as a clap value parser.
///
/// # Errors
///
/// Returns [`PortError`] for non-numeric or out-of-range input.
pub fn parse_port(text: &str) -> Result<u16, PortError> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| PortError::NotANumber(text.to_owned()))?;
    u16::try_from(value)
        .ok()
        .filter(|port| *port >= MIN_PORT)
        .ok_or(PortError::OutOfRange(value))
}
