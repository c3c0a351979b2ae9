//! Configuration of an [`Llm`](super::Llm).

use super::types::{GenerationKwargs, JobIds};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Runtime configuration shared by every backend.
///
/// Unknown fields are rejected on deserialization.
///
/// # Example
///
/// ```rust
/// use synthgen_models::llm::LlmConfig;
/// use std::time::Duration;
///
/// let config: LlmConfig = serde_json::from_str(
///     r#"{"use_offline_batch_generation": true, "offline_batch_generation_block_until_done": 30}"#,
/// )
/// .unwrap();
/// assert_eq!(config.polling_interval(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// The kwargs to be propagated to the generation call of each model.
    pub generation_kwargs: GenerationKwargs,
    /// Whether to use offline batch generation to generate the responses.
    pub use_offline_batch_generation: bool,
    /// If provided, poll until offline batch generation is able to retrieve
    /// the results, waiting this many seconds between polls.
    pub offline_batch_generation_block_until_done: Option<u64>,
    /// Jobs submitted to an offline batch backend, kept to resume polling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs_ids: Option<JobIds>,
}

impl LlmConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one default generation kwarg.
    #[must_use]
    pub fn with_generation_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.generation_kwargs.insert(key.into(), value.into());
        self
    }

    /// Replaces the default generation kwargs.
    #[must_use]
    pub fn with_generation_kwargs(mut self, kwargs: GenerationKwargs) -> Self {
        self.generation_kwargs = kwargs;
        self
    }

    /// Enables or disables offline batch generation.
    #[must_use]
    pub fn with_offline_batch_generation(mut self, enabled: bool) -> Self {
        self.use_offline_batch_generation = enabled;
        self
    }

    /// Polls offline batches until done, waiting `seconds` between attempts.
    #[must_use]
    pub fn with_block_until_done(mut self, seconds: u64) -> Self {
        self.offline_batch_generation_block_until_done = Some(seconds);
        self
    }

    /// Resumes from previously submitted jobs.
    #[must_use]
    pub fn with_jobs_ids(mut self, jobs_ids: JobIds) -> Self {
        self.jobs_ids = Some(jobs_ids);
        self
    }

    /// The polling interval, when blocking until done is enabled.
    #[must_use]
    pub fn polling_interval(&self) -> Option<Duration> {
        self.offline_batch_generation_block_until_done
            .map(Duration::from_secs)
    }
}
