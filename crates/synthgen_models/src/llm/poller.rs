//! Polling of offline batch jobs until they finish.

use super::cancellation::CancellationToken;
use super::error::GenerationError;
use super::types::GenerationBatchResult;
use std::time::Duration;
use tracing::field;

/// Retries an offline batch retrieval until it completes or is cancelled.
///
/// Polling is unbounded: offline batches may take arbitrary time, so the only
/// exits are a finished batch, a cancellation, or an error other than
/// [`GenerationError::OfflineBatchNotFinished`].
#[derive(Debug, Clone)]
pub struct OfflineBatchPoller {
    interval: Duration,
    cancellation: CancellationToken,
}

impl OfflineBatchPoller {
    /// Creates a poller waiting `interval` between attempts.
    ///
    /// The poller watches the process-wide interrupt flag.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancellation: CancellationToken::watching_process_flag(),
        }
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The wait between attempts.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Calls `retrieve` until it returns a batch.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::OfflineBatchNotFinished`] with the latest job
    /// ids when cancelled, and any other error from `retrieve` unchanged.
    pub fn poll<F>(&self, mut retrieve: F) -> Result<GenerationBatchResult, GenerationError>
    where
        F: FnMut() -> Result<GenerationBatchResult, GenerationError>,
    {
        let span = tracing::info_span!(
            "offline_batch_poll",
            interval_secs = self.interval.as_secs_f64(),
            attempts = field::Empty
        );
        let _guard = span.enter();

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            span.record("attempts", attempts);

            let jobs_ids = match retrieve() {
                Ok(outputs) => return Ok(outputs),
                Err(GenerationError::OfflineBatchNotFinished { jobs_ids }) => jobs_ids,
                Err(err) => return Err(err),
            };

            tracing::info!(
                jobs = %jobs_ids,
                interval_secs = self.interval.as_secs_f64(),
                "offline batch generation not finished yet, waiting before polling again"
            );

            if self.cancellation.is_cancelled() {
                tracing::info!(jobs = %jobs_ids, "interrupt flag set, stopping offline batch polling");
                return Err(GenerationError::not_finished(jobs_ids));
            }

            if self.cancellation.wait_timeout(self.interval) {
                tracing::info!(jobs = %jobs_ids, "interrupted while waiting, stopping offline batch polling");
                return Err(GenerationError::not_finished(jobs_ids));
            }
        }
    }
}
