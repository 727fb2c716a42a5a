//! Server bootstrap orchestration.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use corral_config::ServerArgs;
use corral_protocol::Sha256Digest;

use crate::dispatch::{Dispatcher, Services};
use crate::health::HealthReporter;
use crate::notify::{Notifier, SpoolNotifier};
use crate::storage::{self, Database, StorageError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{DatagramListener, ListenerError, ListenerHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the clap error, which renders the usage message.
    fn load(&self) -> Result<ServerArgs, clap::Error>;
}

/// Loader that parses the process command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<ServerArgs, clap::Error> {
        ServerArgs::try_parse()
    }
}

/// Loader that parses a fixed argument vector.
#[derive(Debug, Clone)]
pub struct ArgsConfigLoader {
    args: Vec<OsString>,
}

impl ArgsConfigLoader {
    /// Parses `args` (including the program name) on load.
    #[must_use]
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigLoader for ArgsConfigLoader {
    fn load(&self) -> Result<ServerArgs, clap::Error> {
        ServerArgs::try_parse_from(&self.args)
    }
}

/// Loader returning an already built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(pub ServerArgs);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<ServerArgs, clap::Error> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The command line was invalid or asked for help.
    #[error("{source}")]
    Configuration {
        /// Clap error carrying the rendered usage.
        #[source]
        source: clap::Error,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The database could not be opened.
    #[error("failed to open database: {source}")]
    Database {
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
    /// The socket could not be bound or the loop not started.
    #[error("failed to start listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// Bootstrapped server, ready to bind.
pub struct Server {
    args: ServerArgs,
    services: Arc<Services>,
    reporter: Arc<dyn HealthReporter>,
    telemetry: Option<TelemetryHandle>,
}

impl Server {
    /// Assembles a server from explicit collaborators.
    #[must_use]
    pub fn new(
        args: ServerArgs,
        database: Arc<dyn Database>,
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let services = Services::new(
            database,
            notifier,
            Arc::new(Sha256Digest),
            Arc::clone(&reporter),
        );
        Self {
            args,
            services: Arc::new(services),
            reporter,
            telemetry: None,
        }
    }

    /// Resolved configuration.
    #[must_use]
    pub const fn args(&self) -> &ServerArgs {
        &self.args
    }

    /// Telemetry handle when bootstrap installed one.
    #[must_use]
    pub const fn telemetry(&self) -> Option<TelemetryHandle> {
        self.telemetry
    }

    /// Shared services.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Binds every interface on the configured port and starts receiving.
    ///
    /// IPv6 and IPv4 peers are both served where the host allows a
    /// dual-stack socket.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when binding or spawning fails.
    pub fn start(self) -> Result<RunningServer, BootstrapError> {
        let listener = DatagramListener::bind_any(self.args.port);
        self.launch(listener)
    }

    /// Binds `address` and starts receiving.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when binding or spawning fails.
    pub fn start_on(self, address: SocketAddr) -> Result<RunningServer, BootstrapError> {
        let listener = DatagramListener::bind(address);
        self.launch(listener)
    }

    fn launch(
        self,
        listener: Result<DatagramListener, ListenerError>,
    ) -> Result<RunningServer, BootstrapError> {
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.services)));
        let started =
            listener.and_then(|listener| listener.start(dispatcher, self.args.max_in_flight));
        match started {
            Ok(handle) => {
                self.reporter.listener_ready(handle.local_addr());
                Ok(RunningServer {
                    handle,
                    services: self.services,
                    reporter: self.reporter,
                })
            }
            Err(source) => {
                let error = BootstrapError::Listener { source };
                self.reporter.bootstrap_failed(&error);
                Err(error)
            }
        }
    }
}

/// Server whose receive loop is running.
pub struct RunningServer {
    handle: ListenerHandle,
    services: Arc<Services>,
    reporter: Arc<dyn HealthReporter>,
}

impl RunningServer {
    /// Bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Shared services, including the run flag.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Asks the loop to stop, as a `stop` request would.
    pub fn stop(&self, source: &str) {
        self.services.request_shutdown(source);
    }

    /// Blocks until the loop exits, then releases the socket and database.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop panicked.
    pub fn wait(self) -> Result<(), ListenerError> {
        let outcome = self.handle.join();
        self.reporter.listener_stopped();
        outcome
    }
}

/// Loads configuration, initialises telemetry, opens storage and the
/// notifier, reporting each outcome to `reporter`.
///
/// # Errors
///
/// Returns the first failing stage as a [`BootstrapError`].
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let args = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&args)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    let database = storage::open(&args.database_uri, &args.database_user)
        .map_err(|source| fail(BootstrapError::Database { source }))?;
    let notifier = Arc::new(SpoolNotifier::new(args.mail_spool()));

    reporter.bootstrap_succeeded(&args);
    let mut server = Server::new(args, database, notifier, Arc::clone(&reporter));
    server.telemetry = Some(telemetry);
    Ok(server)
}
