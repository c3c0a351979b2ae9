//! Model invocation layer for synthgen.
//!
//! Provides a single generation contract over heterogeneous LLM backends,
//! decoupling pipeline steps from how each backend produces text.
//!
//! # Overview
//!
//! - Uniform contract: callers only use [`Llm::generate_outputs`](llm::Llm::generate_outputs),
//!   whether the backend is blocking, async, or an offline batch service.
//!
//! - Concurrent fan-out: async backends serve a batch with one task per input
//!   (or per input and generation slot), all in flight at once, on an event
//!   loop owned by the handle.
//!
//! - Offline batches: pending jobs surface as a recoverable error carrying
//!   their ids, or are polled until done when an interval is configured.
//!
//! # Example
//!
//! ```ignore
//! use synthgen_models::llm::{Backend, FormattedInput, GenerationKwargs, Llm, LlmConfig};
//!
//! let mut llm = Llm::new(Backend::repeated_call(MyClient::new()), LlmConfig::default());
//! llm.load()?;
//!
//! let inputs = vec![FormattedInput::user("Write a limerick about queues.")];
//! let outputs = llm.generate_outputs(&inputs, 3, &GenerationKwargs::new())?;
//! assert_eq!(outputs[0].generations.len(), 3);
//! ```

pub mod llm;
