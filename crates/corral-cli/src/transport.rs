//! Request/response link to one server.
//!
//! [`RequestChannel`] is the seam the session talks through; [`UdpLink`] is
//! the datagram implementation used by the binary.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use corral_protocol::{DatagramChannel, Envelope, Operation, Received, TransportError, resolve};

/// Sends requests and waits for correlated responses.
pub trait RequestChannel {
    /// Sends one request. Never retries.
    ///
    /// # Errors
    ///
    /// Propagates encode and socket failures.
    fn send(&self, request: &Envelope) -> Result<(), TransportError>;

    /// Waits for the response to `operation`; `None` when the timeout elapses
    /// first.
    ///
    /// # Errors
    ///
    /// Propagates socket failures other than the timeout.
    fn await_reply(&self, operation: Operation) -> Result<Option<Envelope>, TransportError>;
}

/// UDP socket bound to an ephemeral port, paired with the server address.
#[derive(Debug)]
pub struct UdpLink {
    channel: DatagramChannel,
    server: SocketAddr,
    timeout: Duration,
}

impl UdpLink {
    /// Resolves the server and binds a local socket of the same family.
    ///
    /// # Errors
    ///
    /// Fails when the host does not resolve or no local socket can be bound.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let server = resolve(host, port)?;
        let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        Ok(Self {
            channel: DatagramChannel::bind(local)?,
            server,
            timeout,
        })
    }

    /// Resolved server address.
    #[must_use]
    pub const fn server(&self) -> SocketAddr {
        self.server
    }
}

impl RequestChannel for UdpLink {
    fn send(&self, request: &Envelope) -> Result<(), TransportError> {
        self.channel.send(request, self.server)
    }

    fn await_reply(&self, operation: Operation) -> Result<Option<Envelope>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.channel.receive_one(Some(remaining))? {
                Received::TimedOut => return Ok(None),
                Received::Envelope { envelope, from }
                    if from == self.server && envelope.answers(operation) =>
                {
                    return Ok(Some(envelope));
                }
                // Late replies to earlier requests and stray datagrams.
                Received::Envelope { .. } | Received::Malformed { .. } => {}
            }
        }
    }
}
