//! Counting bound on concurrently handled requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Shared counter of running workers.
#[derive(Debug, Clone)]
pub(super) struct InFlight {
    limit: usize,
    active: Arc<AtomicUsize>,
}

/// Slot held by one worker; released on drop.
#[derive(Debug)]
pub(super) struct Permit {
    active: Arc<AtomicUsize>,
}

impl InFlight {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Takes a slot unless `limit` workers are already running.
    pub(super) fn try_acquire(&self) -> Option<Permit> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < self.limit).then_some(active + 1)
            })
            .ok()
            .map(|_| Permit {
                active: Arc::clone(&self.active),
            })
    }

    pub(super) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for running workers to finish, returning how
    /// many are still running.
    pub(super) fn drain(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while self.active() > 0 && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL);
        }
        self.active()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
