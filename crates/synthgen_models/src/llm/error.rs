//! Error types for generation operations.

use super::types::JobIds;

/// Errors for generation operations.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The backend does not provide an optional capability.
    #[error("`{capability}` is not implemented for `{backend}`")]
    NotImplemented {
        /// Name of the missing operation.
        capability: &'static str,
        /// Backend that was asked for it.
        backend: String,
    },

    /// An offline batch was submitted but its results are not ready yet.
    ///
    /// Recoverable: persist `jobs_ids` and retry later with the same ids.
    #[error("offline batch generation not finished yet (jobs: {jobs_ids})")]
    OfflineBatchNotFinished {
        /// Jobs to resume polling from.
        jobs_ids: JobIds,
    },

    /// An async backend was used before [`Llm::load`](super::Llm::load).
    #[error("model '{model}' is not loaded")]
    NotLoaded {
        /// The model name.
        model: String,
    },

    /// Error in the request arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A backend returned a malformed batch.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A result violates the one-value-per-generation invariant.
    #[error("statistic '{key}' has {actual} values for {expected} generations")]
    InconsistentResult {
        /// Offending statistic key.
        key: String,
        /// Number of generations in the result.
        expected: usize,
        /// Number of values found.
        actual: usize,
    },

    /// Fragments for one input do not share the same statistics keys.
    #[error("statistic '{key}' is missing from fragment {fragment}")]
    InconsistentFragments {
        /// Key present in the first fragment.
        key: String,
        /// Index of the fragment lacking it.
        fragment: usize,
    },

    /// The per-instance event loop could not be created.
    #[error("failed to start event loop: {0}")]
    Runtime(#[source] std::io::Error),

    /// Error returned by the model backend.
    #[error("provider error: {message}")]
    Provider {
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GenerationError {
    /// Creates a [`NotImplemented`](Self::NotImplemented) error.
    #[must_use]
    pub fn not_implemented(capability: &'static str, backend: impl Into<String>) -> Self {
        Self::NotImplemented {
            capability,
            backend: backend.into(),
        }
    }

    /// Creates an [`OfflineBatchNotFinished`](Self::OfflineBatchNotFinished) error.
    #[must_use]
    pub fn not_finished(jobs_ids: JobIds) -> Self {
        Self::OfflineBatchNotFinished { jobs_ids }
    }

    /// Creates a [`Provider`](Self::Provider) error without a source.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`Provider`](Self::Provider) error wrapping a source error.
    #[must_use]
    pub fn provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` for the recoverable "not finished" condition.
    #[must_use]
    pub fn is_not_finished(&self) -> bool {
        matches!(self, Self::OfflineBatchNotFinished { .. })
    }

    /// Returns the job ids carried by a "not finished" error.
    #[must_use]
    pub fn jobs_ids(&self) -> Option<&JobIds> {
        match self {
            Self::OfflineBatchNotFinished { jobs_ids } => Some(jobs_ids),
            _ => None,
        }
    }
}
