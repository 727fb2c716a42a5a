//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use corral_config::ServerArgs;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once storage, notifier, and telemetry are ready.
    fn bootstrap_succeeded(&self, args: &ServerArgs);

    /// Invoked when bootstrap or binding fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the socket is bound and the receive loop is running.
    fn listener_ready(&self, address: SocketAddr);

    /// Invoked when a stop request or signal clears the run flag.
    fn shutdown_requested(&self, source: &str);

    /// Invoked after the receive loop has exited.
    fn listener_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, args: &ServerArgs) {
        (**self).bootstrap_succeeded(args);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, address: SocketAddr) {
        (**self).listener_ready(address);
    }

    fn shutdown_requested(&self, source: &str) {
        (**self).shutdown_requested(source);
    }

    fn listener_stopped(&self) {
        (**self).listener_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, args: &ServerArgs) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            port = args.port,
            database = %args.database_uri,
            database_user = %args.database_user,
            max_in_flight = args.max_in_flight,
            log_filter = %args.log_filter(),
            log_format = %args.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn listener_ready(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %address,
            "listening for datagrams"
        );
    }

    fn shutdown_requested(&self, source: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            source,
            "shutdown requested"
        );
    }

    fn listener_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_stopped",
            "receive loop stopped"
        );
    }
}
