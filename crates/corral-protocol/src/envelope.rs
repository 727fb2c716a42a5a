//! The request/response unit exchanged in a single datagram.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::credential::Credentials;
use crate::operation::Operation;
use crate::payload::Payload;

/// One request or response.
///
/// Envelopes are immutable once built. Responses carry the operation of the
/// request they answer and never carry credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    is_request: bool,
    operation: Operation,
    #[serde(default)]
    body: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<String>,
    created_at: SystemTime,
}

impl Envelope {
    fn build(is_request: bool, operation: Operation, body: Payload) -> Self {
        Self {
            is_request,
            operation,
            body,
            login: None,
            credential: None,
            created_at: SystemTime::now(),
        }
    }

    /// Request without credentials, as sent for `register` and `login`.
    #[must_use]
    pub fn request(operation: Operation, body: Payload) -> Self {
        Self::build(true, operation, body)
    }

    /// Request carrying a login/credential pair.
    #[must_use]
    pub fn authenticated(operation: Operation, body: Payload, credentials: &Credentials) -> Self {
        Self {
            login: Some(credentials.login.clone()),
            credential: Some(credentials.digest.clone()),
            ..Self::build(true, operation, body)
        }
    }

    /// Response for `operation`.
    #[must_use]
    pub fn response(operation: Operation, body: Payload) -> Self {
        Self::build(false, operation, body)
    }

    /// Builds the response to this envelope.
    #[must_use]
    pub fn reply(&self, body: Payload) -> Self {
        Self::response(self.operation, body)
    }

    /// Whether this is a request.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        self.is_request
    }

    /// Operation requested or answered.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Body.
    #[must_use]
    pub const fn body(&self) -> &Payload {
        &self.body
    }

    /// Claimed login, if any.
    #[must_use]
    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    /// Login/credential pair when both are present.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.login, &self.credential) {
            (Some(login), Some(digest)) => Some(Credentials::new(login.clone(), digest.clone())),
            _ => None,
        }
    }

    /// Construction time, kept for diagnostics.
    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Whether this is the response to a request for `operation`.
    #[must_use]
    pub fn answers(&self, operation: Operation) -> bool {
        !self.is_request && self.operation == operation
    }
}
