//! Per-instance event loop for async backends.

use super::error::GenerationError;
use core::future::Future;
use tokio::runtime::{Builder, Runtime};

/// A single-threaded runtime owned by one [`Llm`](super::Llm).
///
/// Fan-out tasks run cooperatively on it while the calling thread blocks, so
/// callers see a plain blocking API.
#[derive(Debug)]
pub(crate) struct EventLoop {
    runtime: Runtime,
}

impl EventLoop {
    pub(crate) fn new() -> Result<Self, GenerationError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(GenerationError::Runtime)?;
        Ok(Self { runtime })
    }

    /// Drives `future` to completion on the calling thread.
    ///
    /// Panics if called from within an async context, like
    /// [`Runtime::block_on`].
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Shuts the runtime down without waiting on leftover tasks.
    pub(crate) fn close(self) {
        self.runtime.shutdown_background();
    }
}
