//! The [`Llm`] handle: one generation contract over every backend kind.

use super::backend::{AsyncBackend, Backend};
use super::cancellation::CancellationToken;
use super::config::LlmConfig;
use super::error::GenerationError;
use super::event_loop::EventLoop;
use super::orchestrator::{FanOutStrategy, agenerate_batch, check_num_generations};
use super::params::{
    RuntimeParameterInfo, RuntimeParametersNames, runtime_parameters_info,
    runtime_parameters_names,
};
use super::poller::OfflineBatchPoller;
use super::types::{
    ChatMessage, FormattedInput, GenerationBatchResult, GenerationKwargs, HiddenState, JobIds,
    StructuredOutput,
};
use core::fmt;
use schemars::{Schema, schema_for};
use serde_json::Value;

/// A model backend wrapped with its configuration and runtime resources.
///
/// Callers use [`generate_outputs`](Self::generate_outputs) regardless of the
/// backend kind. Async backends need [`load`](Self::load) first, which
/// creates the event loop their batches run on; [`unload`](Self::unload)
/// (or dropping the handle) releases it.
///
/// # Example
///
/// ```rust
/// use synthgen_models::llm::{
///     Backend, FormattedInput, GenerationBatchResult, GenerationError, GenerationKwargs,
///     GenerationResult, Llm, LlmConfig, ModelBackend, SyncBackend,
/// };
///
/// struct Constant;
///
/// impl ModelBackend for Constant {
///     fn model_name(&self) -> &str {
///         "constant"
///     }
/// }
///
/// impl SyncBackend for Constant {
///     fn generate(
///         &self,
///         inputs: &[FormattedInput],
///         num_generations: usize,
///         _kwargs: &GenerationKwargs,
///     ) -> Result<GenerationBatchResult, GenerationError> {
///         Ok(inputs
///             .iter()
///             .map(|_| GenerationResult::from_generations(vec!["ok"; num_generations]))
///             .collect())
///     }
/// }
///
/// let mut llm = Llm::new(Backend::sync(Constant), LlmConfig::default());
/// llm.load().unwrap();
/// let outputs = llm
///     .generate_outputs(&[FormattedInput::user("hi")], 2, &GenerationKwargs::new())
///     .unwrap();
/// assert_eq!(outputs[0].generations.len(), 2);
/// ```
pub struct Llm {
    backend: Backend,
    config: LlmConfig,
    cancellation: CancellationToken,
    event_loop: Option<EventLoop>,
    loaded: bool,
}

impl Llm {
    /// Creates a handle from a backend and its configuration.
    ///
    /// Offline polling watches the process-wide interrupt flag unless a token
    /// is supplied with [`with_cancellation`](Self::with_cancellation).
    #[must_use]
    pub fn new(backend: Backend, config: LlmConfig) -> Self {
        Self {
            backend,
            config,
            cancellation: CancellationToken::watching_process_flag(),
            event_loop: None,
            loaded: false,
        }
    }

    /// Replaces the token that interrupts offline polling.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The token that interrupts offline polling.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    // ─────────────────────
    // Lifecycle
    // ─────────────────────

    /// Starts the event loop for async backends, then loads the backend.
    ///
    /// Calling it again on a loaded handle does nothing. On failure the handle
    /// stays unloaded and holds no event loop.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Runtime`] if the event loop cannot be
    /// created, or the backend's own load error.
    pub fn load(&mut self) -> Result<(), GenerationError> {
        if self.loaded {
            return Ok(());
        }

        let event_loop = match self.backend.strategy() {
            Some(_) => Some(EventLoop::new()?),
            None => None,
        };
        if let Err(err) = self.backend.model_mut().load() {
            if let Some(event_loop) = event_loop {
                event_loop.close();
            }
            return Err(err);
        }
        self.event_loop = event_loop;
        self.loaded = true;

        tracing::debug!(
            model = self.model_name(),
            backend = ?self.backend,
            "model loaded"
        );
        Ok(())
    }

    /// Stops the event loop and unloads the backend.
    ///
    /// Calling it on an unloaded handle does nothing.
    pub fn unload(&mut self) {
        if let Some(event_loop) = self.event_loop.take() {
            event_loop.close();
        }
        if self.loaded {
            self.backend.model_mut().unload();
            self.loaded = false;
            tracing::debug!(model = self.model_name(), "model unloaded");
        }
    }

    /// Returns `true` between [`load`](Self::load) and [`unload`](Self::unload).
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // ─────────────────────
    // Accessors
    // ─────────────────────

    /// Returns the model name used by the backend.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.backend.model().model_name()
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// JSON schema of [`LlmConfig`], for configuration tooling.
    #[must_use]
    pub fn config_schema() -> Schema {
        schema_for!(LlmConfig)
    }

    /// The default generation kwargs.
    #[must_use]
    pub fn generation_kwargs(&self) -> &GenerationKwargs {
        &self.config.generation_kwargs
    }

    /// Jobs of the offline batch currently being tracked.
    #[must_use]
    pub fn jobs_ids(&self) -> Option<&JobIds> {
        self.config.jobs_ids.as_ref()
    }

    /// Tracks `jobs_ids`, e.g. when resuming a batch submitted earlier.
    pub fn set_jobs_ids(&mut self, jobs_ids: JobIds) {
        self.config.jobs_ids = Some(jobs_ids);
    }

    /// Forgets the tracked offline jobs.
    pub fn clear_jobs_ids(&mut self) {
        self.config.jobs_ids = None;
    }

    /// Names of the runtime parameters and whether each is optional.
    #[must_use]
    pub fn runtime_parameters_names(&self) -> RuntimeParametersNames {
        runtime_parameters_names(&self.backend.model().generate_parameters())
    }

    /// Descriptions of the runtime parameters.
    #[must_use]
    pub fn runtime_parameters_info(&self) -> Vec<RuntimeParameterInfo> {
        runtime_parameters_info(&self.backend.model().generate_parameters())
    }

    // ─────────────────────
    // Generation
    // ─────────────────────

    /// Generates outputs through the path selected by the configuration.
    ///
    /// - Offline batch generation disabled: [`generate`](Self::generate).
    /// - Enabled without a polling interval: a single
    ///   [`offline_batch_generate`](Self::offline_batch_generate) call.
    /// - Enabled with a polling interval: offline retrieval repeated until the
    ///   batch is done or polling is interrupted.
    ///
    /// `kwargs` override the configured default generation kwargs.
    ///
    /// A direct cancellation of [`cancellation`](Self::cancellation) persists
    /// across calls; reset the token before polling the same batch again.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::OfflineBatchNotFinished`] when an offline
    /// batch is still pending (or polling was interrupted); persist its jobs
    /// and retry later. Any backend failure fails the whole batch.
    pub fn generate_outputs(
        &mut self,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError> {
        if !self.config.use_offline_batch_generation {
            return self.generate(inputs, num_generations, kwargs);
        }

        let Some(interval) = self.config.polling_interval() else {
            return self.offline_batch_generate(inputs, num_generations, kwargs);
        };

        check_num_generations(num_generations)?;
        let kwargs = self.merged_kwargs(kwargs);
        let poller = OfflineBatchPoller::new(interval).with_cancellation(self.cancellation.clone());

        let Self {
            backend, config, ..
        } = self;
        let outputs = poller.poll(|| {
            backend.model().offline_batch_generate(
                inputs,
                num_generations,
                &kwargs,
                &mut config.jobs_ids,
            )
        })?;

        check_batch(inputs.len(), num_generations, &outputs)?;
        Ok(outputs)
    }

    /// Generates `num_generations` outputs for every input with the
    /// backend's batch primitive.
    ///
    /// Async backends fan the batch out concurrently on the event loop and
    /// block until every task has finished.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotLoaded`] for an async backend that was
    /// not loaded, [`GenerationError::InvalidRequest`] for zero generations,
    /// and any backend failure.
    pub fn generate(
        &self,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError> {
        check_num_generations(num_generations)?;
        let kwargs = self.merged_kwargs(kwargs);

        tracing::debug!(
            model = self.model_name(),
            inputs = inputs.len(),
            num_generations,
            "generating"
        );

        let outputs = match &self.backend {
            Backend::Sync(backend) => backend.generate(inputs, num_generations, &kwargs)?,
            Backend::NativeCount(backend) => self.run_async(
                &**backend,
                FanOutStrategy::NativeCount,
                inputs,
                num_generations,
                &kwargs,
            )?,
            Backend::RepeatedCall(backend) => self.run_async(
                &**backend,
                FanOutStrategy::RepeatedCall,
                inputs,
                num_generations,
                &kwargs,
            )?,
        };

        check_batch(inputs.len(), num_generations, &outputs)?;
        Ok(outputs)
    }

    /// Calls the backend's offline batch primitive once.
    ///
    /// The first call submits the batch and records its jobs; later calls
    /// retrieve the results of the recorded jobs.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::OfflineBatchNotFinished`] while the batch is
    /// pending, and [`GenerationError::NotImplemented`] for backends without
    /// offline support.
    pub fn offline_batch_generate(
        &mut self,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError> {
        check_num_generations(num_generations)?;
        let kwargs = self.merged_kwargs(kwargs);

        let outputs = self.backend.model().offline_batch_generate(
            inputs,
            num_generations,
            &kwargs,
            &mut self.config.jobs_ids,
        )?;

        check_batch(inputs.len(), num_generations, &outputs)?;
        Ok(outputs)
    }

    /// Returns the last hidden states of each input.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotImplemented`] unless the backend
    /// supports it.
    pub fn last_hidden_states(
        &self,
        inputs: &[Vec<ChatMessage>],
    ) -> Result<Vec<HiddenState>, GenerationError> {
        self.backend.model().last_hidden_states(inputs)
    }

    /// Converts a structured-output constraint into the backend's guided
    /// generation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotImplemented`] unless the backend
    /// supports it.
    pub fn prepare_structured_output(
        &self,
        structured_output: &StructuredOutput,
    ) -> Result<Value, GenerationError> {
        self.backend.model().prepare_structured_output(structured_output)
    }

    fn run_async(
        &self,
        backend: &dyn AsyncBackend,
        strategy: FanOutStrategy,
        inputs: &[FormattedInput],
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError> {
        let event_loop = self
            .event_loop
            .as_ref()
            .ok_or_else(|| GenerationError::NotLoaded {
                model: backend.model_name().to_string(),
            })?;
        event_loop.block_on(agenerate_batch(
            backend,
            strategy,
            inputs,
            num_generations,
            kwargs,
        ))
    }

    fn merged_kwargs(&self, overrides: &GenerationKwargs) -> GenerationKwargs {
        let mut kwargs = self.config.generation_kwargs.clone();
        kwargs.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        kwargs
    }
}

impl Drop for Llm {
    fn drop(&mut self) {
        self.unload();
    }
}

impl fmt::Debug for Llm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Llm")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

/// One valid result per input, each holding `num_generations` generations.
fn check_batch(
    num_inputs: usize,
    num_generations: usize,
    outputs: &GenerationBatchResult,
) -> Result<(), GenerationError> {
    if outputs.len() != num_inputs {
        return Err(GenerationError::InvalidResponse(format!(
            "expected {num_inputs} results, got {}",
            outputs.len()
        )));
    }
    for (index, output) in outputs.iter().enumerate() {
        if output.len() != num_generations {
            return Err(GenerationError::InvalidResponse(format!(
                "expected {num_generations} generations for input {index}, got {}",
                output.len()
            )));
        }
        output.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::{ModelBackend, SyncBackend};
    use crate::llm::params::GenerateParameter;
    use crate::llm::types::GenerationResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the `suffix` kwarg after each input.
    struct Suffix;

    impl ModelBackend for Suffix {
        fn model_name(&self) -> &str {
            "suffix"
        }

        fn generate_parameters(&self) -> Vec<GenerateParameter> {
            vec![
                GenerateParameter::required("inputs"),
                GenerateParameter::optional("suffix"),
            ]
        }
    }

    impl SyncBackend for Suffix {
        fn generate(
            &self,
            inputs: &[FormattedInput],
            num_generations: usize,
            kwargs: &GenerationKwargs,
        ) -> Result<GenerationBatchResult, GenerationError> {
            let suffix = kwargs.get("suffix").and_then(Value::as_str).unwrap_or("");
            Ok(inputs
                .iter()
                .map(|input| {
                    let text = format!("{}{suffix}", input.last_content().unwrap_or_default());
                    GenerationResult::from_generations(vec![text; num_generations])
                })
                .collect())
        }
    }

    struct Short;

    impl ModelBackend for Short {
        fn model_name(&self) -> &str {
            "short"
        }
    }

    impl SyncBackend for Short {
        fn generate(
            &self,
            _inputs: &[FormattedInput],
            _num_generations: usize,
            _kwargs: &GenerationKwargs,
        ) -> Result<GenerationBatchResult, GenerationError> {
            Ok(Vec::new())
        }
    }

    struct Lazy;

    impl ModelBackend for Lazy {
        fn model_name(&self) -> &str {
            "lazy"
        }
    }

    #[async_trait]
    impl AsyncBackend for Lazy {
        async fn agenerate(
            &self,
            _input: &FormattedInput,
            num_generations: usize,
            _kwargs: &GenerationKwargs,
        ) -> Result<GenerationResult, GenerationError> {
            Ok(GenerationResult::from_generations(vec!["lazy"; num_generations]))
        }
    }

    /// Fails its first load.
    struct Flaky {
        loads: Arc<AtomicUsize>,
        unloads: Arc<AtomicUsize>,
    }

    impl ModelBackend for Flaky {
        fn model_name(&self) -> &str {
            "flaky"
        }

        fn load(&mut self) -> Result<(), GenerationError> {
            if self.loads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(GenerationError::provider("weights not downloaded yet"));
            }
            Ok(())
        }

        fn unload(&mut self) {
            self.unloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AsyncBackend for Flaky {
        async fn agenerate(
            &self,
            _input: &FormattedInput,
            num_generations: usize,
            _kwargs: &GenerationKwargs,
        ) -> Result<GenerationResult, GenerationError> {
            Ok(GenerationResult::from_generations(vec!["flaky"; num_generations]))
        }
    }

    #[test]
    fn explicit_kwargs_override_configured_defaults() {
        let config = LlmConfig::new().with_generation_kwarg("suffix", "!");
        let llm = Llm::new(Backend::sync(Suffix), config);
        let inputs = [FormattedInput::user("hi")];

        let outputs = llm.generate(&inputs, 1, &GenerationKwargs::new()).unwrap();
        assert_eq!(outputs[0].generations, vec![Some("hi!".to_string())]);

        let mut overrides = GenerationKwargs::new();
        overrides.insert("suffix".to_string(), json!("?"));
        let outputs = llm.generate(&inputs, 1, &overrides).unwrap();
        assert_eq!(outputs[0].generations, vec![Some("hi?".to_string())]);
    }

    #[test]
    fn zero_generations_is_rejected() {
        let llm = Llm::new(Backend::sync(Suffix), LlmConfig::default());
        let err = llm
            .generate(&[FormattedInput::user("hi")], 0, &GenerationKwargs::new())
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }

    #[test]
    fn short_batch_is_an_invalid_response() {
        let llm = Llm::new(Backend::sync(Short), LlmConfig::default());
        let err = llm
            .generate(&[FormattedInput::user("hi")], 1, &GenerationKwargs::new())
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn async_backend_requires_load() {
        let mut llm = Llm::new(Backend::native_count(Lazy), LlmConfig::default());
        let inputs = [FormattedInput::user("hi")];

        let err = llm.generate(&inputs, 1, &GenerationKwargs::new()).unwrap_err();
        assert!(matches!(err, GenerationError::NotLoaded { ref model } if model == "lazy"));

        llm.load().unwrap();
        assert!(llm.is_loaded());
        assert!(llm.generate(&inputs, 2, &GenerationKwargs::new()).is_ok());

        llm.unload();
        assert!(!llm.is_loaded());
        assert!(llm.generate(&inputs, 1, &GenerationKwargs::new()).is_err());
    }

    #[test]
    fn load_and_unload_are_idempotent() {
        let mut llm = Llm::new(Backend::repeated_call(Lazy), LlmConfig::default());
        llm.load().unwrap();
        llm.load().unwrap();
        llm.unload();
        llm.unload();
        llm.load().unwrap();
        assert!(llm.is_loaded());
    }

    #[test]
    fn failed_load_leaves_handle_unloaded() {
        let loads = Arc::new(AtomicUsize::new(0));
        let unloads = Arc::new(AtomicUsize::new(0));
        let backend = Flaky {
            loads: loads.clone(),
            unloads: unloads.clone(),
        };
        let mut llm = Llm::new(Backend::native_count(backend), LlmConfig::default());
        let inputs = [FormattedInput::user("hi")];

        assert!(matches!(llm.load(), Err(GenerationError::Provider { .. })));
        assert!(!llm.is_loaded());
        assert!(matches!(
            llm.generate(&inputs, 1, &GenerationKwargs::new()),
            Err(GenerationError::NotLoaded { .. })
        ));

        llm.load().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(llm.generate(&inputs, 1, &GenerationKwargs::new()).is_ok());

        drop(llm);
        assert_eq!(unloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_parameters_come_from_backend() {
        let llm = Llm::new(Backend::sync(Suffix), LlmConfig::default());
        let names = serde_json::to_value(llm.runtime_parameters_names()).unwrap();
        assert_eq!(names["generation_kwargs"], json!({"suffix": true}));
        assert_eq!(llm.runtime_parameters_info().len(), 3);
    }

    #[test]
    fn config_schema_describes_fields() {
        let schema = serde_json::to_value(Llm::config_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("generation_kwargs").is_some());
        assert!(properties.get("offline_batch_generation_block_until_done").is_some());
    }

    #[test]
    fn jobs_ids_are_reconfigurable() {
        let config = LlmConfig::new().with_jobs_ids(JobIds::new(["a"]));
        let mut llm = Llm::new(Backend::sync(Suffix), config);
        assert_eq!(llm.jobs_ids(), Some(&JobIds::new(["a"])));

        llm.set_jobs_ids(JobIds::new(["b"]));
        assert_eq!(llm.config().jobs_ids, Some(JobIds::new(["b"])));

        llm.clear_jobs_ids();
        assert!(llm.jobs_ids().is_none());
    }
}
