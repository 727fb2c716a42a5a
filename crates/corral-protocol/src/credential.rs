//! Credential digests and the login/credential pair attached to requests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One-way digest applied to a secret before it leaves the client or is
/// stored by the server.
///
/// Both ends must agree on the implementation; the default is
/// [`Sha256Digest`].
pub trait CredentialDigest: Send + Sync {
    /// Digests `secret` into its stored/transmitted form.
    fn digest(&self, secret: &str) -> String;
}

/// SHA-256 rendered as lower-case hexadecimal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl CredentialDigest for Sha256Digest {
    fn digest(&self, secret: &str) -> String {
        let hash = Sha256::digest(secret.as_bytes());
        hash.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

/// Login and digested credential carried by every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    /// Mailbox address identifying the user.
    pub login: String,
    /// Digest of the user's secret.
    pub digest: String,
}

impl Credentials {
    /// Pairs a login with an already digested secret.
    #[must_use]
    pub fn new(login: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            digest: digest.into(),
        }
    }

    /// Digests `secret` with `digest` and pairs it with `login`.
    #[must_use]
    pub fn from_secret(login: impl Into<String>, secret: &str, digest: &dyn CredentialDigest) -> Self {
        Self::new(login, digest.digest(secret))
    }
}
