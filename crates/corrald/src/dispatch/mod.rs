//! Request handling for the datagram listener.
//!
//! Each request datagram is routed through a [`DispatchRegistry`] keyed by
//! [`Operation`](corral_protocol::Operation). Before a handler runs, the
//! [`Dispatcher`] re-derives the acting user from the credentials carried by
//! the envelope; there is no session state between datagrams. Requests for
//! operations other than `register` and `login` whose credentials do not
//! resolve are dropped without a reply.
//!
//! | operation      | reply                 |
//! |----------------|-----------------------|
//! | `info`         | `collection_info`     |
//! | `show`         | `records`, sorted     |
//! | `register`     | `flag`                |
//! | `login`        | `flag`                |
//! | anything else  | none                  |
//!
//! [`DispatchRegistry`]: corral_protocol::DispatchRegistry

mod context;
mod dispatcher;
mod errors;
mod handlers;
mod secret;

pub use self::context::{RequestContext, Services};
pub use self::dispatcher::Dispatcher;
pub use self::errors::HandlerError;
pub(crate) use self::handlers::request_registry;
pub use self::secret::{SECRET_ALPHABET, SECRET_LENGTH, generate_secret};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

#[cfg(test)]
mod tests;
