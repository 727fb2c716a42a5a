//! Receive loop for the server socket.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info, warn};

use corral_protocol::{DatagramChannel, Envelope, Received};

use super::in_flight::InFlight;
use super::{LISTENER_TARGET, ListenerError};
use crate::dispatch::Dispatcher;

/// How long one receive waits before the run flag is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
/// Grace period for in-flight workers once the loop exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound server socket, not yet receiving.
#[derive(Debug)]
pub struct DatagramListener {
    channel: DatagramChannel,
    address: SocketAddr,
}

impl DatagramListener {
    /// Binds the server socket.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] when the address is unavailable.
    pub fn bind(address: SocketAddr) -> Result<Self, ListenerError> {
        Self::from_channel(DatagramChannel::bind(&address.to_string())?)
    }

    /// Binds `port` on every interface.
    ///
    /// One IPv6 socket accepts both IPv6 and IPv4 peers where the host
    /// supports it; otherwise only the IPv4 wildcard is bound.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] when the IPv4 fallback also fails.
    pub fn bind_any(port: u16) -> Result<Self, ListenerError> {
        match dual_stack_socket(port) {
            Ok(socket) => Self::from_channel(DatagramChannel::from_socket(socket)),
            Err(error) => {
                debug!(
                    target: LISTENER_TARGET,
                    port,
                    error = %error,
                    "dual-stack bind unavailable, binding IPv4 only"
                );
                Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            }
        }
    }

    fn from_channel(channel: DatagramChannel) -> Result<Self, ListenerError> {
        let address = channel.local_addr()?;
        Ok(Self { channel, address })
    }

    /// Address actually bound (resolves port `0`).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Starts the receive loop on a background thread.
    ///
    /// The loop runs until the dispatcher's run flag is cleared, by a `stop`
    /// request, a signal, or [`ListenerHandle::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Spawn`] when the thread cannot be created.
    pub fn start(
        self,
        dispatcher: Arc<Dispatcher>,
        max_in_flight: usize,
    ) -> Result<ListenerHandle, ListenerError> {
        let running = dispatcher.services().run_flag();
        let address = self.address;
        let channel = Arc::new(self.channel);
        let flag = Arc::clone(&running);
        let in_flight = InFlight::new(max_in_flight);
        let handle = thread::Builder::new()
            .name(String::from("corrald-listener"))
            .spawn(move || run_receive_loop(&channel, &flag, &dispatcher, &in_flight))
            .map_err(ListenerError::Spawn)?;
        Ok(ListenerHandle {
            running,
            address,
            handle: Some(handle),
        })
    }
}

fn dual_stack_socket(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_only_v6(false)?;
    socket.bind(&SockAddr::from(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))))?;
    Ok(socket.into())
}

/// Handle to the background receive loop.
#[derive(Debug)]
pub struct ListenerHandle {
    running: Arc<AtomicBool>,
    address: SocketAddr,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Address the loop is receiving on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Shared run flag; clearing it stops the loop.
    #[must_use]
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Clears the run flag.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Waits for the loop, and its in-flight workers, to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn run_receive_loop(
    channel: &Arc<DatagramChannel>,
    running: &AtomicBool,
    dispatcher: &Arc<Dispatcher>,
    in_flight: &InFlight,
) {
    info!(target: LISTENER_TARGET, "datagram listener active");
    let mut last_error = None::<String>;
    while running.load(Ordering::SeqCst) {
        match channel.receive_one(Some(POLL_INTERVAL)) {
            Ok(Received::TimedOut) => {}
            Ok(Received::Malformed { from, error }) => {
                last_error = None;
                debug!(
                    target: LISTENER_TARGET,
                    %from,
                    error = %error,
                    "dropping undecodable datagram"
                );
            }
            Ok(Received::Envelope { envelope, from }) => {
                last_error = None;
                if envelope.is_request() {
                    spawn_worker(envelope, from, channel, dispatcher, in_flight);
                } else {
                    debug!(
                        target: LISTENER_TARGET,
                        %from,
                        operation = %envelope.operation(),
                        "ignoring response datagram"
                    );
                }
            }
            Err(error) => {
                let message = error.to_string();
                if last_error.as_deref() != Some(message.as_str()) {
                    warn!(target: LISTENER_TARGET, error = %message, "datagram receive error");
                }
                last_error = Some(message);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    let remaining = in_flight.drain(DRAIN_TIMEOUT);
    if remaining > 0 {
        warn!(
            target: LISTENER_TARGET,
            remaining,
            "request workers still running at shutdown"
        );
    }
    info!(target: LISTENER_TARGET, "datagram listener stopped");
}

fn spawn_worker(
    request: Envelope,
    from: SocketAddr,
    channel: &Arc<DatagramChannel>,
    dispatcher: &Arc<Dispatcher>,
    in_flight: &InFlight,
) {
    let Some(permit) = in_flight.try_acquire() else {
        warn!(
            target: LISTENER_TARGET,
            %from,
            operation = %request.operation(),
            active = in_flight.active(),
            "in-flight limit reached; dropping request"
        );
        return;
    };
    let channel = Arc::clone(channel);
    let dispatcher = Arc::clone(dispatcher);
    let spawned = thread::Builder::new()
        .name(String::from("corrald-request"))
        .spawn(move || {
            let _permit = permit;
            let Some(reply) = dispatcher.handle(&request, from) else {
                return;
            };
            if let Err(error) = channel.send(&reply, from) {
                warn!(
                    target: LISTENER_TARGET,
                    %from,
                    operation = %reply.operation(),
                    error = %error,
                    "failed to send reply"
                );
            }
        });
    if let Err(error) = spawned {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            "failed to spawn request worker"
        );
    }
}
