//! Model-invocation layer for synthetic data generation pipelines.
//!
//! One generation contract over blocking, async and offline batch LLM
//! backends. See [`synthgen_models::llm`] for the contract and
//! [`synthgen_core`] for logging and Ctrl-C wiring.
//!
//! ```ignore
//! use synthgen::prelude::*;
//!
//! TracingConfig::default().init();
//!
//! let mut llm = Llm::new(Backend::native_count(MyClient::new()), LlmConfig::default());
//! llm.load()?;
//! let outputs = llm.generate_outputs(&[FormattedInput::user("Hi")], 2, &GenerationKwargs::new())?;
//! ```

pub use synthgen_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use synthgen_internal::prelude::*;
}
