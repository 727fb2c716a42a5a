use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;

/// Default log filter expression used by the server.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default logging format for the server.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Compact;

/// How long the client waits for a correlated response.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Upper bound on concurrently handled requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Lowest port either binary accepts.
pub const MIN_PORT: u16 = 1024;

/// Directory the spool notifier writes delivered secrets into.
#[must_use]
pub fn default_mail_spool() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("corral");
    if apply_namespace {
        base.push(user_namespace());
    }
    base.join("outbox")
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    String::from("shared")
}
