//! Operation-keyed handler tables.
//!
//! Each endpoint owns one [`DispatchRegistry`]. The server fills the request
//! table and the client fills the response table; the shapes differ because a
//! request handler produces an optional reply while a response handler only
//! updates caller state. An operation without a handler is ignored.

use std::collections::HashMap;
use std::fmt;

use crate::envelope::Envelope;
use crate::operation::Operation;

/// Which table a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Handlers invoked for incoming requests.
    Request,
    /// Handlers invoked for incoming responses.
    Response,
}

type RequestHandler<C> = Box<dyn Fn(&C, &Envelope) -> Option<Envelope> + Send + Sync>;
type ResponseHandler<C> = Box<dyn Fn(&mut C, &Envelope) + Send + Sync>;

/// Handler tables parameterised over the caller's context type.
pub struct DispatchRegistry<C> {
    requests: HashMap<Operation, RequestHandler<C>>,
    responses: HashMap<Operation, ResponseHandler<C>>,
}

impl<C> Default for DispatchRegistry<C> {
    fn default() -> Self {
        Self {
            requests: HashMap::new(),
            responses: HashMap::new(),
        }
    }
}

impl<C> DispatchRegistry<C> {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the request handler for `operation`, replacing any previous
    /// one.
    pub fn on_request<F>(&mut self, operation: Operation, handler: F) -> &mut Self
    where
        F: Fn(&C, &Envelope) -> Option<Envelope> + Send + Sync + 'static,
    {
        self.requests.insert(operation, Box::new(handler));
        self
    }

    /// Installs the response handler for `operation`, replacing any previous
    /// one.
    pub fn on_response<F>(&mut self, operation: Operation, handler: F) -> &mut Self
    where
        F: Fn(&mut C, &Envelope) + Send + Sync + 'static,
    {
        self.responses.insert(operation, Box::new(handler));
        self
    }

    /// Whether a handler is installed for `operation` in `role`'s table.
    #[must_use]
    pub fn has_handler(&self, role: Role, operation: Operation) -> bool {
        match role {
            Role::Request => self.requests.contains_key(&operation),
            Role::Response => self.responses.contains_key(&operation),
        }
    }

    /// Runs the request handler for `envelope`, returning its reply.
    #[must_use]
    pub fn dispatch_request(&self, context: &C, envelope: &Envelope) -> Option<Envelope> {
        self.requests
            .get(&envelope.operation())
            .and_then(|handler| handler(context, envelope))
    }

    /// Runs the response handler for `envelope`, if any.
    pub fn dispatch_response(&self, context: &mut C, envelope: &Envelope) {
        if let Some(handler) = self.responses.get(&envelope.operation()) {
            handler(context, envelope);
        }
    }

    /// Routes `envelope` by direction: requests may yield a reply, responses
    /// never do.
    pub fn dispatch(&self, context: &mut C, envelope: &Envelope) -> Option<Envelope> {
        if envelope.is_request() {
            self.dispatch_request(context, envelope)
        } else {
            self.dispatch_response(context, envelope);
            None
        }
    }
}

impl<C> fmt::Debug for DispatchRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRegistry")
            .field("requests", &self.requests.keys().collect::<Vec<_>>())
            .field("responses", &self.responses.keys().collect::<Vec<_>>())
            .finish()
    }
}
