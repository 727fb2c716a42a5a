//! Test doubles and scenario worlds shared by the behavioural suites.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use corral_config::{DatabaseUri, ServerArgs};
use corral_protocol::{
    Credentials, DatagramChannel, Envelope, Operation, Payload, Received, Record, Sha256Digest,
};

use crate::bootstrap::{BootstrapError, RunningServer, Server};
use crate::health::HealthReporter;
use crate::notify::{Notifier, NotifyError, is_valid_address};
use crate::storage::MemoryDatabase;

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE_POLL: Duration = Duration::from_millis(20);

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady,
    ShutdownRequested(String),
    ListenerStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _args: &ServerArgs) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, _address: SocketAddr) {
        self.record(HealthEvent::ListenerReady);
    }

    fn shutdown_requested(&self, source: &str) {
        self.record(HealthEvent::ShutdownRequested(source.to_owned()));
    }

    fn listener_stopped(&self) {
        self.record(HealthEvent::ListenerStopped);
    }
}

/// Notifier that keeps delivered secrets in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<HashMap<String, String>>,
}

impl RecordingNotifier {
    pub fn secret_for(&self, address: &str) -> Option<String> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .get(address)
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, address: &str, secret: &str) -> Result<(), NotifyError> {
        if !is_valid_address(address) {
            return Err(NotifyError::InvalidAddress(address.to_owned()));
        }
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .insert(address.to_owned(), secret.to_owned());
        Ok(())
    }
}

/// A server on a loopback port with a client socket talking to it.
pub struct ServerWorld {
    pub reporter: Arc<RecordingHealthReporter>,
    pub notifier: Arc<RecordingNotifier>,
    server: Option<RunningServer>,
    target: Option<SocketAddr>,
    client: DatagramChannel,
    client_timeout: Duration,
    credentials: Option<Credentials>,
    last_reply: Option<Received>,
}

impl ServerWorld {
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            server: None,
            target: None,
            client: DatagramChannel::bind("127.0.0.1:0").expect("bind client socket"),
            client_timeout: REPLY_TIMEOUT,
            credentials: None,
            last_reply: None,
        }
    }

    pub fn start_server(&mut self) {
        let server = Server::new(
            ServerArgs::new(4000, DatabaseUri::Memory, "scenario"),
            Arc::new(MemoryDatabase::new()),
            self.notifier.clone(),
            self.reporter.clone(),
        );
        let running = server
            .start_on("127.0.0.1:0".parse().expect("loopback address"))
            .expect("start server");
        self.target = Some(running.local_addr());
        self.server = Some(running);
    }

    /// Points the client at a socket that never answers.
    pub fn use_silent_peer(&mut self, silent: &DatagramChannel, timeout: Duration) {
        self.target = Some(silent.local_addr().expect("silent peer address"));
        self.client_timeout = timeout;
    }

    fn target(&self) -> SocketAddr {
        self.target.expect("server target set")
    }

    fn credentials(&self) -> &Credentials {
        self.credentials.as_ref().expect("user logged in")
    }

    /// Sends a request and waits for the next datagram.
    pub fn exchange(&mut self, request: &Envelope) -> &Received {
        self.client.send(request, self.target()).expect("send request");
        let received = self
            .client
            .receive_one(Some(self.client_timeout))
            .expect("receive reply");
        self.last_reply.insert(received)
    }

    /// Sends an authenticated request without waiting.
    pub fn fire(&self, operation: Operation, body: Payload) {
        let request = Envelope::authenticated(operation, body, self.credentials());
        self.client.send(&request, self.target()).expect("send request");
    }

    pub fn register(&mut self, address: &str) -> Option<bool> {
        let request = Envelope::request(Operation::Register, Payload::Text(address.to_owned()));
        reply_flag(self.exchange(&request))
    }

    pub fn login(&mut self, address: &str, secret: &str) -> Option<bool> {
        let credentials = Credentials::from_secret(address, secret, &Sha256Digest);
        let request = Envelope::authenticated(Operation::Login, Payload::None, &credentials);
        let accepted = reply_flag(self.exchange(&request));
        if accepted == Some(true) {
            self.credentials = Some(credentials);
        }
        accepted
    }

    pub fn register_and_login(&mut self, address: &str) {
        assert_eq!(self.register(address), Some(true), "registration failed");
        let secret = self
            .notifier
            .secret_for(address)
            .expect("secret delivered");
        assert_eq!(self.login(address, &secret), Some(true), "login failed");
    }

    pub fn show(&mut self) -> Vec<Record> {
        let request = Envelope::authenticated(Operation::Show, Payload::None, self.credentials());
        match self.exchange(&request) {
            Received::Envelope { envelope, .. } => {
                envelope.body().as_records().unwrap_or_default().to_vec()
            }
            other => panic!("expected show reply, got {other:?}"),
        }
    }

    /// Repeats `show` until `expected` names appear or the deadline passes.
    ///
    /// Fire-and-forget requests are handled on their own threads, so a
    /// `show` sent right after them may overtake them.
    pub fn settled_names(&mut self, expected: &[&str]) -> Vec<String> {
        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let mut names: Vec<String> = self.show().into_iter().map(|r| r.name).collect();
            names.sort();
            if names == expected || Instant::now() >= deadline {
                return names;
            }
            thread::sleep(SETTLE_POLL);
        }
    }

    /// Repeats `show` until it returns exactly `expected`, in any order, or
    /// the deadline passes.
    pub fn settled_records(&mut self, expected: &[Record]) -> Vec<Record> {
        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let records = self.show();
            if holds_exactly(&records, expected) || Instant::now() >= deadline {
                return records;
            }
            thread::sleep(SETTLE_POLL);
        }
    }

    pub fn last_reply(&self) -> Option<&Received> {
        self.last_reply.as_ref()
    }

    pub fn client_credentials(&self) -> Credentials {
        self.credentials().clone()
    }

    pub fn server_address(&self) -> SocketAddr {
        self.target()
    }

    /// Waits for the receive loop to exit after a stop request.
    pub fn wait_for_stop(&mut self) -> bool {
        let Some(server) = self.server.take() else {
            return false;
        };
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while server.services().is_running() && Instant::now() < deadline {
            thread::sleep(SETTLE_POLL);
        }
        if server.services().is_running() {
            server.stop("test teardown");
            let _ = server.wait();
            return false;
        }
        server.wait().is_ok()
    }
}

impl Drop for ServerWorld {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.stop("test teardown");
            let _ = server.wait();
        }
    }
}

fn reply_flag(received: &Received) -> Option<bool> {
    match received {
        Received::Envelope { envelope, .. } => envelope.body().as_flag(),
        _ => None,
    }
}

/// Whether `records` and `expected` hold the same records, field for field,
/// ignoring order.
pub fn holds_exactly(records: &[Record], expected: &[Record]) -> bool {
    let occurrences =
        |list: &[Record], wanted: &Record| list.iter().filter(|record| *record == wanted).count();
    records.len() == expected.len()
        && expected
            .iter()
            .all(|wanted| occurrences(records, wanted) == occurrences(expected, wanted))
}
