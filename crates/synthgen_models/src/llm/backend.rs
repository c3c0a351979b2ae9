//! Traits implemented by model backends, and the [`Backend`] strategy enum.
//!
//! Every backend implements [`ModelBackend`] for the shared surface (name,
//! lifecycle hooks, optional capabilities), plus exactly one generation
//! primitive:
//!
//! - [`SyncBackend`] generates a whole batch in one blocking call.
//! - [`AsyncBackend`] generates for a single input asynchronously; the
//!   orchestrator fans a batch out over it.
//!
//! Whether an async backend accepts a generation count is decided once, when
//! the backend is wrapped in a [`Backend`] variant.

use super::error::GenerationError;
use super::orchestrator::FanOutStrategy;
use super::params::GenerateParameter;
use super::types::{
    ChatMessage, FormattedInput, GenerationBatchResult, GenerationKwargs, GenerationResult,
    HiddenState, JobIds, StructuredOutput,
};
use async_trait::async_trait;
use core::fmt;
use serde_json::Value;

/// Shared surface of every model backend.
///
/// Optional capabilities have default implementations that fail with
/// [`GenerationError::NotImplemented`].
pub trait ModelBackend: Send + Sync + 'static {
    /// Returns the model name used by this backend.
    fn model_name(&self) -> &str;

    /// Short name of the backend type, used in error messages.
    fn backend_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Acquires backend resources (clients, weights, tokenizers).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    fn load(&mut self) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Releases backend resources.
    fn unload(&mut self) {}

    /// Describes the keyword parameters accepted by the generation primitive.
    ///
    /// Used for runtime configuration discovery; reserved names (`input`,
    /// `inputs`, `num_generations`) are filtered out by the caller.
    fn generate_parameters(&self) -> Vec<GenerateParameter> {
        Vec::new()
    }

    /// Submits or retrieves an offline batch.
    ///
    /// The first call should submit jobs and store their ids in `jobs_ids`.
    /// Later calls read `jobs_ids` to retrieve results, returning
    /// [`GenerationError::OfflineBatchNotFinished`] with the ids while the
    /// batch is still running.
    ///
    /// # Errors
    ///
    /// Fails with [`GenerationError::NotImplemented`] unless overridden.
    fn offline_batch_generate(
        &self,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
        jobs_ids: &mut Option<JobIds>,
    ) -> Result<GenerationBatchResult, GenerationError> {
        let _ = (inputs, num_generations, kwargs, jobs_ids);
        Err(GenerationError::not_implemented(
            "offline_batch_generate",
            self.backend_name(),
        ))
    }

    /// Returns the last hidden states for each input.
    ///
    /// # Errors
    ///
    /// Fails with [`GenerationError::NotImplemented`] unless overridden.
    fn last_hidden_states(
        &self,
        inputs: &[Vec<ChatMessage>],
    ) -> Result<Vec<HiddenState>, GenerationError> {
        let _ = inputs;
        Err(GenerationError::not_implemented(
            "last_hidden_states",
            self.backend_name(),
        ))
    }

    /// Converts a structured-output constraint into the backend's guided
    /// generation configuration.
    ///
    /// # Errors
    ///
    /// Fails with [`GenerationError::NotImplemented`] unless overridden.
    fn prepare_structured_output(
        &self,
        structured_output: &StructuredOutput,
    ) -> Result<Value, GenerationError> {
        let _ = structured_output;
        Err(GenerationError::not_implemented(
            "prepare_structured_output",
            self.backend_name(),
        ))
    }
}

/// A backend that generates a whole batch in one blocking call.
pub trait SyncBackend: ModelBackend {
    /// Generates `num_generations` outputs for every input.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails for any input.
    fn generate(
        &self,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError>;
}

/// A backend that generates for a single input asynchronously.
#[async_trait]
pub trait AsyncBackend: ModelBackend {
    /// Generates outputs for one input.
    ///
    /// Backends wrapped with [`Backend::repeated_call`] are always called
    /// with `num_generations == 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn agenerate(
        &self,
        input: &FormattedInput,
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationResult, GenerationError>;
}

/// A backend together with the strategy used to serve batches with it.
pub enum Backend {
    /// Batch generation delegated directly to the backend.
    Sync(Box<dyn SyncBackend>),
    /// One concurrent call per input, each asking for all generations.
    NativeCount(Box<dyn AsyncBackend>),
    /// One concurrent single-generation call per input per generation slot.
    RepeatedCall(Box<dyn AsyncBackend>),
}

impl Backend {
    /// Wraps a batch backend.
    #[must_use]
    pub fn sync(backend: impl SyncBackend) -> Self {
        Self::Sync(Box::new(backend))
    }

    /// Wraps an async backend that accepts a generation count.
    #[must_use]
    pub fn native_count(backend: impl AsyncBackend) -> Self {
        Self::NativeCount(Box::new(backend))
    }

    /// Wraps an async backend that produces one generation per call.
    #[must_use]
    pub fn repeated_call(backend: impl AsyncBackend) -> Self {
        Self::RepeatedCall(Box::new(backend))
    }

    /// Fan-out strategy for async backends, `None` for sync ones.
    #[must_use]
    pub fn strategy(&self) -> Option<FanOutStrategy> {
        match self {
            Self::Sync(_) => None,
            Self::NativeCount(_) => Some(FanOutStrategy::NativeCount),
            Self::RepeatedCall(_) => Some(FanOutStrategy::RepeatedCall),
        }
    }

    /// The shared backend surface.
    #[must_use]
    pub fn model(&self) -> &dyn ModelBackend {
        match self {
            Self::Sync(backend) => &**backend,
            Self::NativeCount(backend) | Self::RepeatedCall(backend) => &**backend,
        }
    }

    pub(crate) fn model_mut(&mut self) -> &mut dyn ModelBackend {
        match self {
            Self::Sync(backend) => &mut **backend,
            Self::NativeCount(backend) | Self::RepeatedCall(backend) => &mut **backend,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Sync(_) => "Sync",
            Self::NativeCount(_) => "NativeCount",
            Self::RepeatedCall(_) => "RepeatedCall",
        };
        f.debug_struct("Backend")
            .field("kind", &kind)
            .field("backend", &self.model().backend_name())
            .field("model", &self.model().model_name())
            .finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = core::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
