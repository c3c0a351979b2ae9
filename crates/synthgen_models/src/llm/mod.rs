//! Model invocation: one generation contract over sync, async and offline
//! batch backends.
//!
//! - [`Llm`] dispatches a batch to the right generation path.
//! - [`agenerate_batch`] fans a batch out concurrently over an
//!   [`AsyncBackend`].
//! - [`merge_responses`] folds single-generation fragments back into one
//!   result per input.
//! - [`OfflineBatchPoller`] retries offline retrieval until done or
//!   cancelled.

mod backend;
mod cancellation;
mod config;
mod error;
mod event_loop;
mod merge;
mod model;
mod orchestrator;
mod params;
mod poller;
mod types;

pub use backend::{AsyncBackend, Backend, ModelBackend, SyncBackend};
pub use cancellation::{
    CancellationToken, INTERRUPT_FLAG_ENV, process_interrupt_requested, request_process_interrupt,
};
pub use config::LlmConfig;
pub use error::GenerationError;
pub use merge::{merge_responses, try_merge_responses};
pub use model::Llm;
pub use orchestrator::{FanOutStrategy, agenerate_batch};
pub use params::{
    GenerateParameter, RESERVED_PARAMETERS, RuntimeParameterInfo, RuntimeParameterName,
    RuntimeParametersNames, runtime_parameters_info, runtime_parameters_names,
};
pub use poller::OfflineBatchPoller;
pub use types::{
    ChatMessage, FormattedInput, GenerationBatchResult, GenerationKwargs, GenerationResult,
    HiddenState, INPUT_TOKENS, JobIds, Logprobs, OUTPUT_TOKENS, Role, Statistics,
    StructuredOutput, StructuredOutputFormat, TokenLogprob,
};
