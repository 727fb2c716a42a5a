//! Datagram listener for the server.
//!
//! The listener binds one UDP socket and runs the receive loop on a
//! background thread. Each request datagram is handed to the [`Dispatcher`]
//! on its own worker thread, bounded by an in-flight limit; replies go out
//! through the same socket.
//!
//! [`Dispatcher`]: crate::dispatch::Dispatcher

mod errors;
mod in_flight;
mod listener;

pub use self::errors::ListenerError;
pub use self::listener::{DatagramListener, ListenerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
