//! Cancellation of offline batch polling.
//!
//! Two channels stop a poll loop:
//!
//! - A [`CancellationToken`] cancelled directly, e.g. by a Ctrl-C handler.
//!   This wakes a poller in the middle of its wait.
//! - The process-wide interrupt flag, raised by
//!   [`request_process_interrupt`] or inherited through the
//!   [`INTERRUPT_FLAG_ENV`] environment variable. Tokens built with
//!   [`CancellationToken::watching_process_flag`] observe it before each wait.
//!
//! Either way the poller surfaces the pending jobs instead of discarding them.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Environment variable whose presence marks the process as interrupted.
///
/// Supervisors set it in a worker's environment to stop polling without
/// delivering a signal to the worker.
pub const INTERRUPT_FLAG_ENV: &str = "SYNTHGEN_SIGINT_HANDLER_CALLED";

static PROCESS_INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Raises the process-wide interrupt flag.
pub fn request_process_interrupt() {
    PROCESS_INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Returns `true` once the process-wide interrupt flag is raised.
#[must_use]
pub fn process_interrupt_requested() -> bool {
    PROCESS_INTERRUPTED.load(Ordering::SeqCst) || std::env::var_os(INTERRUPT_FLAG_ENV).is_some()
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    watch_process_flag: bool,
}

/// A cloneable handle used to interrupt a poll loop.
///
/// All clones share state: cancelling one cancels every clone and wakes any
/// thread blocked in [`wait_timeout`](Self::wait_timeout).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that is only cancelled directly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also reports cancelled once the process-wide
    /// interrupt flag is raised.
    #[must_use]
    pub fn watching_process_flag() -> Self {
        Self {
            inner: Arc::new(Inner {
                watch_process_flag: true,
                ..Inner::default()
            }),
        }
    }

    /// Cancels the token and wakes waiting threads.
    ///
    /// The token stays cancelled until [`reset`](Self::reset), so every later
    /// poll using it stops after its first retrieval.
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.condvar.notify_all();
    }

    /// Clears a direct cancellation so the token can guard another poll.
    ///
    /// The process-wide interrupt flag is not cleared.
    pub fn reset(&self) {
        *self.inner.cancelled.lock() = false;
    }

    /// Returns `true` if the token was cancelled or, for watching tokens, the
    /// process-wide flag is raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock() || (self.inner.watch_process_flag && process_interrupt_requested())
    }

    /// Blocks for `timeout` or until the token is cancelled directly.
    ///
    /// Returns `true` if the wait ended because of cancellation.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            match deadline {
                Some(deadline) => {
                    if self.inner.condvar.wait_until(&mut cancelled, deadline).timed_out() {
                        return *cancelled;
                    }
                }
                None => self.inner.condvar.wait(&mut cancelled),
            }
        }
        true
    }
}
