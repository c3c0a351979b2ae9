//! Ctrl-C handling for offline batch polling.
//!
//! Offline polling can wait for hours. An interrupt should stop the wait and
//! hand the pending jobs back to the caller rather than kill the process.
//! Two handlers are provided:
//!
//! - [`cancel_on_ctrl_c`] cancels a [`CancellationToken`] directly, for a
//!   process that owns its [`Llm`](synthgen_models::llm::Llm) handles.
//! - [`forward_ctrl_c_to_process_flag`] raises the process-wide interrupt
//!   flag instead, for worker processes whose handles watch the flag.

use core::future::Future;
use std::io;
use std::thread::{self, JoinHandle};
use synthgen_models::llm::{CancellationToken, request_process_interrupt};
use tokio::runtime::Builder;

/// Cancels `token` on the first Ctrl-C.
///
/// The listener runs on its own thread, so it works while the main thread
/// is blocked in a poll.
///
/// # Errors
///
/// Returns an error if the listener runtime or thread cannot be created.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    spawn_signal_listener(tokio::signal::ctrl_c, move || {
        tracing::info!("received Ctrl-C, cancelling offline batch polling");
        token.cancel();
    })
}

/// Raises the process-wide interrupt flag on the first Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener runtime or thread cannot be created.
pub fn forward_ctrl_c_to_process_flag() -> io::Result<JoinHandle<()>> {
    spawn_signal_listener(tokio::signal::ctrl_c, || {
        tracing::info!("received Ctrl-C, raising the process interrupt flag");
        request_process_interrupt();
    })
}

/// Runs `on_signal` once the future built by `signal` resolves successfully.
///
/// The future is created inside the listener runtime.
fn spawn_signal_listener<S, F, H>(signal: S, on_signal: H) -> io::Result<JoinHandle<()>>
where
    S: FnOnce() -> F + Send + 'static,
    F: Future<Output = io::Result<()>>,
    H: FnOnce() + Send + 'static,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    thread::Builder::new()
        .name("synthgen-interrupt".to_string())
        .spawn(move || match runtime.block_on(async move { signal().await }) {
            Ok(()) => on_signal(),
            Err(err) => tracing::warn!(error = %err, "failed to listen for Ctrl-C"),
        })
}
