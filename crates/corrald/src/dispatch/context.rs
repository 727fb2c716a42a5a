//! Shared services and the per-request view handed to handlers.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use corral_protocol::CredentialDigest;

use crate::health::HealthReporter;
use crate::notify::Notifier;
use crate::storage::{Database, UserId};

/// Collaborators shared by every worker thread.
pub struct Services {
    database: Arc<dyn Database>,
    notifier: Arc<dyn Notifier>,
    digest: Arc<dyn CredentialDigest>,
    reporter: Arc<dyn HealthReporter>,
    running: Arc<AtomicBool>,
}

impl Services {
    /// Bundles the collaborators with a fresh run flag set to "continue".
    #[must_use]
    pub fn new(
        database: Arc<dyn Database>,
        notifier: Arc<dyn Notifier>,
        digest: Arc<dyn CredentialDigest>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            database,
            notifier,
            digest,
            reporter,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Storage backend.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.database.as_ref()
    }

    /// Secret delivery.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Credential digest shared with clients.
    #[must_use]
    pub fn digest(&self) -> &dyn CredentialDigest {
        self.digest.as_ref()
    }

    /// The "should continue" flag polled by the receive loop.
    #[must_use]
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether the receive loop should keep going.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the run flag, reporting `source` the first time.
    pub fn request_shutdown(&self, source: &str) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.reporter.shutdown_requested(source);
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Context for one request: the shared services, the sender, and the user
/// its credentials resolved to.
#[derive(Debug, Clone)]
pub struct RequestContext {
    services: Arc<Services>,
    peer: SocketAddr,
    user: Option<UserId>,
}

impl RequestContext {
    pub(crate) const fn new(services: Arc<Services>, peer: SocketAddr, user: Option<UserId>) -> Self {
        Self {
            services,
            peer,
            user,
        }
    }

    /// Shared services.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Sender of the request.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Acting user; `None` only for `register` and `login`.
    #[must_use]
    pub const fn user(&self) -> Option<UserId> {
        self.user
    }
}
