//! Process-level infrastructure for synthgen binaries.
//!
//! - [`tracing_setup`] installs the `tracing` subscriber.
//! - [`interrupt`] turns Ctrl-C into cancellation of offline batch polling.

pub mod interrupt;
pub mod tracing_setup;

pub use interrupt::{cancel_on_ctrl_c, forward_ctrl_c_to_process_flag};
pub use tracing_setup::{ParseTracingFormatError, TracingConfig, TracingFormat};
