//! Credential resolution and routing for one request datagram.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use corral_protocol::{DispatchRegistry, Envelope, Role};

use super::context::{RequestContext, Services};
use super::{DISPATCH_TARGET, request_registry};
use crate::storage::UserId;

/// Routes requests to their handlers after resolving the acting user.
#[derive(Debug)]
pub struct Dispatcher {
    registry: DispatchRegistry<RequestContext>,
    services: Arc<Services>,
}

impl Dispatcher {
    /// Creates a dispatcher with the standard request table.
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            registry: request_registry(),
            services,
        }
    }

    /// Shared services.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Handles one decoded datagram from `peer`, returning the reply to send.
    ///
    /// Responses, operations without a handler, and requests whose
    /// credentials do not resolve all yield `None`.
    #[must_use]
    pub fn handle(&self, request: &Envelope, peer: SocketAddr) -> Option<Envelope> {
        let operation = request.operation();
        if !request.is_request() {
            debug!(target: DISPATCH_TARGET, %operation, %peer, "ignoring response datagram");
            return None;
        }
        if !self.registry.has_handler(Role::Request, operation) {
            debug!(target: DISPATCH_TARGET, %operation, %peer, "no handler registered");
            return None;
        }

        let user = if operation.is_anonymous() {
            None
        } else {
            Some(self.resolve_user(request, peer)?)
        };
        let context = RequestContext::new(Arc::clone(&self.services), peer, user);
        self.registry.dispatch_request(&context, request)
    }

    fn resolve_user(&self, request: &Envelope, peer: SocketAddr) -> Option<UserId> {
        let operation = request.operation();
        let Some(credentials) = request.credentials() else {
            warn!(target: DISPATCH_TARGET, %operation, %peer, "request without credentials dropped");
            return None;
        };
        match self
            .services
            .database()
            .resolve_user_id(&credentials.login, &credentials.digest)
        {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %operation,
                    %peer,
                    login = %credentials.login,
                    "credentials rejected"
                );
                None
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %operation,
                    %peer,
                    error = %error,
                    "credential lookup failed"
                );
                None
            }
        }
    }
}
