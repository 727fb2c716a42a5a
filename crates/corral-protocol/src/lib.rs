//! Wire protocol shared by the corral server and client.
//!
//! A client and server exchange [`Envelope`]s, one per UDP datagram, encoded
//! as JSON. Every request names an [`Operation`]; authenticated requests also
//! carry the [`Credentials`] the server re-checks on every packet, so there is
//! no server-side session. Each endpoint routes incoming envelopes through a
//! [`DispatchRegistry`]: the server registers request handlers, the client
//! registers response handlers.
//!
//! ## Wire format
//!
//! ```json
//! {"is_request":true,"operation":"add",
//!  "body":{"kind":"record","value":{"name":"crate","size":2.0,
//!          "position":{"x":0.0,"y":0.0},
//!          "created_at":{"secs_since_epoch":0,"nanos_since_epoch":0}}},
//!  "login":"user@example.org","credential":"<sha-256 hex>",
//!  "created_at":{"secs_since_epoch":0,"nanos_since_epoch":0}}
//! ```
//!
//! Encodings larger than [`MAX_DATAGRAM_BYTES`] are rejected, never split.

pub mod codec;
pub mod credential;
pub mod envelope;
pub mod operation;
pub mod payload;
pub mod record;
pub mod registry;
pub mod transport;

pub use codec::{CodecError, MAX_DATAGRAM_BYTES, RECEIVE_BUFFER_BYTES, decode, encode};
pub use credential::{CredentialDigest, Credentials, Sha256Digest};
pub use envelope::Envelope;
pub use operation::Operation;
pub use payload::Payload;
pub use record::{CollectionInfo, Position, Record, RecordError, sort_natural};
pub use registry::{DispatchRegistry, Role};
pub use transport::{DatagramChannel, Received, TransportError, resolve};
