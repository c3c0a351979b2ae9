//! Simulated backends standing in for real providers.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use synthgen_models::llm::{
    AsyncBackend, FormattedInput, GenerateParameter, GenerationBatchResult, GenerationError,
    GenerationKwargs, GenerationResult, JobIds, ModelBackend, SyncBackend,
};

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

fn prompt_tokens(input: &FormattedInput) -> u64 {
    input.messages.iter().map(|m| word_count(&m.content)).sum()
}

/// Answers by echoing the prompt after a fixed network latency.
///
/// Honors the `max_new_tokens` kwarg by truncating the answer to that many
/// words.
#[derive(Debug, Clone)]
pub struct SimulatedChat {
    model: String,
    latency: Duration,
}

impl SimulatedChat {
    /// Creates a chat backend for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, latency: Duration) -> Self {
        Self {
            model: model.into(),
            latency,
        }
    }

    fn answer(&self, input: &FormattedInput, kwargs: &GenerationKwargs) -> String {
        let prompt = input.last_content().unwrap_or_default();
        let full = format!("{} says: {prompt}", self.model);
        match kwargs.get("max_new_tokens").and_then(Value::as_u64) {
            Some(limit) => full
                .split_whitespace()
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect::<Vec<_>>()
                .join(" "),
            None => full,
        }
    }
}

impl ModelBackend for SimulatedChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate_parameters(&self) -> Vec<GenerateParameter> {
        vec![
            GenerateParameter::required("input"),
            GenerateParameter::optional("num_generations"),
            GenerateParameter::optional("max_new_tokens")
                .with_description("The maximum number of new tokens to generate."),
            GenerateParameter::optional("temperature")
                .with_description("The temperature to use for the generation."),
        ]
    }
}

#[async_trait]
impl AsyncBackend for SimulatedChat {
    async fn agenerate(
        &self,
        input: &FormattedInput,
        num_generations: usize,
        kwargs: &GenerationKwargs,
    ) -> Result<GenerationResult, GenerationError> {
        tokio::time::sleep(self.latency).await;

        let text = self.answer(input, kwargs);
        let output_tokens = word_count(&text);
        Ok(
            GenerationResult::from_generations(vec![text; num_generations]).with_token_usage(
                vec![prompt_tokens(input); num_generations],
                vec![output_tokens; num_generations],
            ),
        )
    }
}

/// An offline batch service that finishes after a number of polls.
#[derive(Debug)]
pub struct SimulatedBatchService {
    pending_polls: usize,
    polls: AtomicUsize,
}

impl SimulatedBatchService {
    /// Creates a service answering "not finished" for `pending_polls` polls
    /// after submission.
    #[must_use]
    pub fn new(pending_polls: usize) -> Self {
        Self {
            pending_polls,
            polls: AtomicUsize::new(0),
        }
    }

    fn results(inputs: &[FormattedInput], num_generations: usize) -> GenerationBatchResult {
        inputs
            .iter()
            .map(|input| {
                let text = format!("batched answer to: {}", input.last_content().unwrap_or_default());
                let output_tokens = word_count(&text);
                GenerationResult::from_generations(vec![text; num_generations]).with_token_usage(
                    vec![prompt_tokens(input); num_generations],
                    vec![output_tokens; num_generations],
                )
            })
            .collect()
    }
}

impl ModelBackend for SimulatedBatchService {
    fn model_name(&self) -> &str {
        "simulated-batch"
    }

    fn offline_batch_generate(
        &self,
        inputs: &[FormattedInput],
        num_generations: usize,
        _kwargs: &GenerationKwargs,
        jobs_ids: &mut Option<JobIds>,
    ) -> Result<GenerationBatchResult, GenerationError> {
        let Some(jobs) = jobs_ids.as_ref() else {
            let jobs = JobIds::new((0..inputs.len()).map(|i| format!("batch_job_{i:04}")));
            tracing::info!(jobs = %jobs, "submitted offline batch");
            *jobs_ids = Some(jobs.clone());
            return Err(GenerationError::not_finished(jobs));
        };

        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if polls <= self.pending_polls {
            return Err(GenerationError::not_finished(jobs.clone()));
        }

        Ok(Self::results(inputs, num_generations))
    }
}

impl SyncBackend for SimulatedBatchService {
    fn generate(
        &self,
        inputs: &[FormattedInput],
        num_generations: usize,
        _kwargs: &GenerationKwargs,
    ) -> Result<GenerationBatchResult, GenerationError> {
        Ok(Self::results(inputs, num_generations))
    }
}
