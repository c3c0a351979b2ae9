//! Demo settings read from the environment.

use std::num::ParseIntError;
use std::time::Duration;
use synthgen_core::{ParseTracingFormatError, TracingConfig};
use synthgen_models::llm::LlmConfig;
use tracing::Level;

/// Number of generations per prompt.
pub const NUM_GENERATIONS_ENV: &str = "SYNTHGEN_NUM_GENERATIONS";
/// Simulated per-call latency, in milliseconds.
pub const LATENCY_MS_ENV: &str = "SYNTHGEN_LATENCY_MS";
/// Polls the simulated batch service answers "not finished" to.
pub const PENDING_POLLS_ENV: &str = "SYNTHGEN_PENDING_POLLS";
/// JSON [`LlmConfig`] for the offline batch model.
pub const OFFLINE_CONFIG_ENV: &str = "SYNTHGEN_OFFLINE_CONFIG";
/// Log level (`trace`, `debug`, `info`, ...).
pub const LOG_LEVEL_ENV: &str = "SYNTHGEN_LOG_LEVEL";
/// Log format (`pretty`, `compact`, `json`).
pub const LOG_FORMAT_ENV: &str = "SYNTHGEN_LOG_FORMAT";
/// Target-specific log filter.
pub const LOG_FILTER_ENV: &str = "SYNTHGEN_LOG_FILTER";

/// Errors reading demo settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A numeric variable did not parse.
    #[error("{var}='{value}' is not a valid number")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: ParseIntError,
    },

    /// The log level did not parse.
    #[error("SYNTHGEN_LOG_LEVEL='{0}' is not a valid log level")]
    InvalidLevel(String),

    /// The log format did not parse.
    #[error(transparent)]
    InvalidFormat(#[from] ParseTracingFormatError),

    /// The offline model configuration is not a valid [`LlmConfig`].
    #[error("SYNTHGEN_OFFLINE_CONFIG is not a valid model configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),
}

/// Settings of one demo run.
#[derive(Debug, Clone)]
pub struct DemoSettings {
    /// Generations requested per prompt.
    pub num_generations: usize,
    /// Latency of each simulated chat call.
    pub latency: Duration,
    /// Polls before the simulated batch service finishes.
    pub pending_polls: usize,
    /// Configuration of the offline batch model.
    pub offline_config: LlmConfig,
    /// Logging configuration.
    pub tracing: TracingConfig,
}

impl DemoSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] naming the first malformed variable.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] naming the first malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let number = |var: &'static str, default: u64| -> Result<u64, SettingsError> {
            lookup(var).map_or(Ok(default), |value| {
                value
                    .trim()
                    .parse()
                    .map_err(|source| SettingsError::InvalidNumber { var, value, source })
            })
        };

        let num_generations = number(NUM_GENERATIONS_ENV, 2)?;
        let latency = Duration::from_millis(number(LATENCY_MS_ENV, 200)?);
        let pending_polls = number(PENDING_POLLS_ENV, 2)?;

        let offline_config = match lookup(OFFLINE_CONFIG_ENV) {
            Some(json) => serde_json::from_str(&json).map_err(SettingsError::InvalidConfig)?,
            None => LlmConfig::new()
                .with_offline_batch_generation(true)
                .with_block_until_done(1),
        };

        let mut tracing = TracingConfig::new();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            tracing = tracing.with_level(
                level
                    .parse::<Level>()
                    .map_err(|_| SettingsError::InvalidLevel(level))?,
            );
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            tracing = tracing.with_format(format.parse()?);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            tracing = tracing.with_env_filter(filter);
        }

        Ok(Self {
            num_generations: usize::try_from(num_generations).unwrap_or(usize::MAX),
            latency,
            pending_polls: usize::try_from(pending_polls).unwrap_or(usize::MAX),
            offline_config,
            tracing,
        })
    }
}
