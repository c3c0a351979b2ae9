//! Building blocks of the `synthgen-demo` binary.
//!
//! The demo drives the three generation paths of
//! [`Llm`](synthgen_models::llm::Llm) against simulated backends:
//!
//! - repeated-call fan-out over [`SimulatedChat`],
//! - native-count fan-out over the same backend,
//! - offline batch polling over [`SimulatedBatchService`].

mod backends;
mod settings;

pub use backends::{SimulatedBatchService, SimulatedChat};
pub use settings::{
    DemoSettings, LATENCY_MS_ENV, LOG_FILTER_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV,
    NUM_GENERATIONS_ENV, OFFLINE_CONFIG_ENV, PENDING_POLLS_ENV, SettingsError,
};
