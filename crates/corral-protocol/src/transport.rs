//! One envelope per UDP datagram.
//!
//! [`DatagramChannel`] owns the socket for its whole life: it is bound on
//! construction and closed when dropped. Sends and receives only need `&self`,
//! so one channel can be shared between a receive loop and reply workers.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::codec::{self, CodecError, MAX_DATAGRAM_BYTES, RECEIVE_BUFFER_BYTES};
use crate::envelope::Envelope;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Shortest read timeout the socket accepts; zero means "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Errors surfaced by the datagram transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local address could not be bound.
    #[error("failed to bind UDP socket at {address}: {source}")]
    Bind {
        /// Requested address.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The peer address did not resolve.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        /// Address as given.
        address: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The peer address resolved to nothing.
    #[error("no addresses resolved for {address}")]
    ResolveEmpty {
        /// Address as given.
        address: String,
    },
    /// A socket option could not be applied.
    #[error("failed to configure UDP socket: {0}")]
    Configure(#[source] io::Error),
    /// The envelope could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Transmission failed.
    #[error("failed to send datagram to {destination}: {source}")]
    Send {
        /// Intended recipient.
        destination: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Reception failed for a reason other than a timeout.
    #[error("failed to receive datagram: {0}")]
    Receive(#[source] io::Error),
}

/// Outcome of a single receive.
#[derive(Debug)]
pub enum Received {
    /// A well-formed envelope and its sender.
    Envelope {
        /// Decoded envelope.
        envelope: Envelope,
        /// Sender address for replies.
        from: SocketAddr,
    },
    /// A datagram arrived but was not an envelope.
    Malformed {
        /// Sender address.
        from: SocketAddr,
        /// Why decoding failed.
        error: CodecError,
    },
    /// Nothing arrived before the timeout.
    TimedOut,
}

/// Datagram endpoint that speaks envelopes.
#[derive(Debug)]
pub struct DatagramChannel {
    socket: UdpSocket,
}

impl DatagramChannel {
    /// Binds a socket at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] when the address is unavailable.
    pub fn bind(address: &str) -> Result<Self, TransportError> {
        UdpSocket::bind(address)
            .map(Self::from_socket)
            .map_err(|source| TransportError::Bind {
                address: address.to_owned(),
                source,
            })
    }

    /// Wraps an already bound socket.
    #[must_use]
    pub const fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the socket query failure.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Configure)
    }

    /// Encodes and sends `envelope` to `destination`. Never retries.
    ///
    /// # Errors
    ///
    /// Returns a codec error for oversized envelopes or a send error from the
    /// socket.
    pub fn send(&self, envelope: &Envelope, destination: SocketAddr) -> Result<(), TransportError> {
        let bytes = codec::encode(envelope)?;
        self.socket
            .send_to(&bytes, destination)
            .map_err(|source| TransportError::Send {
                destination,
                source,
            })?;
        debug!(
            target: TRANSPORT_TARGET,
            operation = %envelope.operation(),
            request = envelope.is_request(),
            bytes = bytes.len(),
            %destination,
            "datagram sent"
        );
        Ok(())
    }

    /// Waits for one datagram.
    ///
    /// `None` blocks until something arrives.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Receive`] for socket failures other than the
    /// timeout elapsing.
    pub fn receive_one(&self, timeout: Option<Duration>) -> Result<Received, TransportError> {
        let timeout = timeout.map(|duration| duration.max(MIN_READ_TIMEOUT));
        self.socket
            .set_read_timeout(timeout)
            .map_err(TransportError::Configure)?;

        let mut buffer = vec![0_u8; RECEIVE_BUFFER_BYTES];
        let (len, from) = match self.socket.recv_from(&mut buffer) {
            Ok(received) => received,
            Err(error) if is_timeout(&error) => return Ok(Received::TimedOut),
            Err(error) => return Err(TransportError::Receive(error)),
        };
        if len > MAX_DATAGRAM_BYTES {
            return Ok(Received::Malformed {
                from,
                error: CodecError::Oversized {
                    size: len,
                    max_size: MAX_DATAGRAM_BYTES,
                },
            });
        }
        buffer.truncate(len);
        Ok(match codec::decode(&buffer) {
            Ok(envelope) => Received::Envelope { envelope, from },
            Err(error) => Received::Malformed { from, error },
        })
    }
}

/// Resolves `host:port` to the first usable socket address.
///
/// # Errors
///
/// Fails when resolution errors or yields nothing.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let address = format!("{host}:{port}");
    let mut candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            address: address.clone(),
            source,
        })?;
    candidates
        .next()
        .ok_or(TransportError::ResolveEmpty { address })
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::operation::Operation;
    use crate::payload::Payload;

    #[fixture]
    fn pair() -> (DatagramChannel, DatagramChannel) {
        let left = DatagramChannel::bind("127.0.0.1:0").expect("bind left");
        let right = DatagramChannel::bind("127.0.0.1:0").expect("bind right");
        (left, right)
    }

    #[rstest]
    fn envelope_crosses_the_socket(pair: (DatagramChannel, DatagramChannel)) {
        let (left, right) = pair;
        let envelope = Envelope::request(Operation::Login, Payload::None);
        left.send(&envelope, right.local_addr().expect("addr"))
            .expect("send");

        match right
            .receive_one(Some(Duration::from_secs(2)))
            .expect("receive")
        {
            Received::Envelope { envelope: got, from } => {
                assert_eq!(got, envelope);
                assert_eq!(from, left.local_addr().expect("addr"));
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[rstest]
    fn silence_times_out(pair: (DatagramChannel, DatagramChannel)) {
        let (_, right) = pair;
        let outcome = right
            .receive_one(Some(Duration::from_millis(50)))
            .expect("receive");
        assert!(matches!(outcome, Received::TimedOut));
    }

    #[rstest]
    fn garbage_is_reported_as_malformed(pair: (DatagramChannel, DatagramChannel)) {
        let (left, right) = pair;
        let raw = UdpSocket::bind("127.0.0.1:0").expect("bind raw");
        raw.send_to(b"{not an envelope", right.local_addr().expect("addr"))
            .expect("send raw");
        drop(left);

        let outcome = right
            .receive_one(Some(Duration::from_secs(2)))
            .expect("receive");
        assert!(matches!(
            outcome,
            Received::Malformed {
                error: CodecError::Decode(_),
                ..
            }
        ));
    }

    #[test]
    fn resolve_handles_loopback() {
        let address = resolve("127.0.0.1", 4000).expect("resolve");
        assert_eq!(address.port(), 4000);
    }
}
