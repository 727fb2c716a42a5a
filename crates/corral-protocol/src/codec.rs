//! JSON encoding of envelopes into single datagrams.

use thiserror::Error;

use crate::envelope::Envelope;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_BYTES: usize = 65_507;

/// Receive buffer size; one byte larger than any legal datagram so
/// truncation is detectable.
pub const RECEIVE_BUFFER_BYTES: usize = 0x1_0000;

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The encoded envelope does not fit in one datagram.
    #[error("encoded envelope is {size} bytes, exceeding the {max_size} byte datagram limit")]
    Oversized {
        /// Encoded length.
        size: usize,
        /// Limit that was exceeded.
        max_size: usize,
    },
    /// Serialisation failed.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    /// The bytes are not a well-formed envelope.
    #[error("failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes an envelope into one datagram.
///
/// # Errors
///
/// Returns [`CodecError::Oversized`] rather than fragmenting when the
/// encoding exceeds [`MAX_DATAGRAM_BYTES`].
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(envelope).map_err(CodecError::Encode)?;
    if bytes.len() > MAX_DATAGRAM_BYTES {
        return Err(CodecError::Oversized {
            size: bytes.len(),
            max_size: MAX_DATAGRAM_BYTES,
        });
    }
    Ok(bytes)
}

/// Decodes one datagram into an envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for anything that is not a complete
/// envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}
