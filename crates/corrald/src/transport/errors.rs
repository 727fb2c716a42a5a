//! Error types for the datagram listener.

use thiserror::Error;

use corral_protocol::TransportError;

/// Errors surfaced while binding or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The socket could not be bound.
    #[error(transparent)]
    Bind(#[from] TransportError),
    /// The receive thread could not be spawned.
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The receive thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
