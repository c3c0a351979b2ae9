//! # synthgen Internal Library
//!
//! Re-exports the synthgen crates for convenience.

/// Generation contract, orchestration, and offline polling.
pub use synthgen_models;

/// Logging setup and process interrupt wiring.
pub use synthgen_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use synthgen_core::{TracingConfig, TracingFormat};
    pub use synthgen_models::llm::{
        AsyncBackend, Backend, CancellationToken, ChatMessage, FormattedInput,
        GenerationBatchResult, GenerationError, GenerationKwargs, GenerationResult, JobIds, Llm,
        LlmConfig, ModelBackend, Role, SyncBackend,
    };
}
