//! Test doubles for the client: a scripted link and a fake UDP server.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use corral_protocol::{DatagramChannel, Envelope, Operation, Payload, Received, TransportError};

use crate::console::Console;
use crate::run_with_echo;
use crate::transport::RequestChannel;

const SERVER_POLL: Duration = Duration::from_millis(20);
const DRAIN_WAIT: Duration = Duration::from_millis(100);

/// In-process link: records every request and replays queued replies.
#[derive(Default)]
pub(super) struct ScriptedLink {
    sent: RefCell<Vec<Envelope>>,
    replies: RefCell<VecDeque<Envelope>>,
}

impl ScriptedLink {
    pub fn replying(replies: impl IntoIterator<Item = Envelope>) -> Self {
        Self {
            sent: RefCell::default(),
            replies: RefCell::new(replies.into_iter().collect()),
        }
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.borrow().clone()
    }

    pub fn unused_replies(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl RequestChannel for ScriptedLink {
    fn send(&self, request: &Envelope) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(request.clone());
        Ok(())
    }

    fn await_reply(&self, _operation: Operation) -> Result<Option<Envelope>, TransportError> {
        Ok(self.replies.borrow_mut().pop_front())
    }
}

/// Console over an in-memory script with captured output.
///
/// The read position survives across [`ScriptedConsole::with`] calls.
pub(super) struct ScriptedConsole {
    input: Cursor<Vec<u8>>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        let input: String = lines.iter().map(|line| format!("{line}\n")).collect();
        Self {
            input: Cursor::new(input.into_bytes()),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Runs `body` with a console reading the script.
    pub fn with<T>(
        &mut self,
        body: impl FnOnce(&mut Console<'_, &mut Cursor<Vec<u8>>, Vec<u8>, Vec<u8>>) -> T,
    ) -> T {
        let mut console = Console::new(&mut self.input, &mut self.stdout, &mut self.stderr, false);
        body(&mut console)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// UDP server on loopback that answers selected operations with fixed bodies.
pub(super) struct FakeServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<Envelope>>>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    pub fn spawn(replies: HashMap<Operation, Payload>) -> Result<Self> {
        let channel = DatagramChannel::bind("127.0.0.1:0").context("bind fake server")?;
        let address = channel.local_addr().context("fake server address")?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));
        let handle = {
            let requests = Arc::clone(&requests);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    Self::serve_one(&channel, &replies, &requests, SERVER_POLL);
                }
                while Self::serve_one(&channel, &replies, &requests, DRAIN_WAIT) {}
            })
        };
        Ok(Self {
            address,
            requests,
            running,
            handle: Some(handle),
        })
    }

    fn serve_one(
        channel: &DatagramChannel,
        replies: &HashMap<Operation, Payload>,
        requests: &Mutex<Vec<Envelope>>,
        wait: Duration,
    ) -> bool {
        let Ok(Received::Envelope { envelope, from }) = channel.receive_one(Some(wait)) else {
            return false;
        };
        if let Some(body) = replies.get(&envelope.operation()) {
            let _ = channel.send(&envelope.reply(body.clone()), from);
        }
        if let Ok(mut guard) = requests.lock() {
            guard.push(envelope);
        }
        true
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// Stops the server after draining queued datagrams and returns every
    /// request it saw.
    pub fn finish(&mut self) -> Result<Vec<Envelope>> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Runs the full client against a fake server.
#[derive(Default)]
pub(super) struct ClientWorld {
    pub server: Option<FakeServer>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<Envelope>,
}

impl ClientWorld {
    pub fn start_server(&mut self, replies: HashMap<Operation, Payload>) -> Result<()> {
        self.server = Some(FakeServer::spawn(replies)?);
        Ok(())
    }

    /// Runs the client with `|`-separated script lines as stdin.
    pub fn run_script(&mut self, script: &str) -> Result<()> {
        let server = self.server.as_mut().context("fake server started")?;
        let port = server.port().to_string();
        let args = ["corral", "127.0.0.1", port.as_str(), "--timeout-ms", "300"];
        let mut input = script.split('|').collect::<Vec<_>>().join("\n");
        input.push('\n');
        let exit = run_with_echo(
            args,
            Cursor::new(input.into_bytes()),
            &mut self.stdout,
            &mut self.stderr,
            false,
        );
        self.exit_code = Some(exit);
        self.requests = server.finish()?;
        Ok(())
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.requests.iter().map(Envelope::operation).collect()
    }
}
