//! Concurrent fan-out of a batch over an [`AsyncBackend`].
//!
//! Every task for a batch is created up front and driven with
//! [`try_join_all`], so all provider calls are in flight before any is
//! awaited to completion. Results come back in submission order regardless
//! of completion order. The first failing task fails the whole batch and the
//! remaining tasks are dropped; no partial batch is ever returned.

use super::backend::AsyncBackend;
use super::error::GenerationError;
use super::merge::try_merge_responses;
use super::types::{FormattedInput, GenerationBatchResult, GenerationKwargs, GenerationResult};
use futures::future::try_join_all;

/// How a batch is fanned out over an async backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutStrategy {
    /// One task per input requesting all generations at once.
    NativeCount,
    /// One single-generation task per input per generation slot, merged per input.
    RepeatedCall,
}

impl FanOutStrategy {
    /// Number of tasks scheduled for a batch.
    #[must_use]
    pub fn task_count(self, num_inputs: usize, num_generations: usize) -> usize {
        match self {
            Self::NativeCount => num_inputs,
            Self::RepeatedCall => num_inputs * num_generations,
        }
    }
}

/// Generates outputs for a batch by fanning out concurrent backend calls.
///
/// # Errors
///
/// Returns [`GenerationError::InvalidRequest`] for zero generations, the
/// first task error, or [`GenerationError::InconsistentFragments`] if
/// repeated-call fragments for one input disagree on statistics keys.
pub async fn agenerate_batch(
    backend: &dyn AsyncBackend,
    strategy: FanOutStrategy,
    inputs: &[FormattedInput],
    num_generations: usize,
    kwargs: &GenerationKwargs,
) -> Result<GenerationBatchResult, GenerationError> {
    check_num_generations(num_generations)?;

    tracing::debug!(
        model = backend.model_name(),
        ?strategy,
        inputs = inputs.len(),
        num_generations,
        tasks = strategy.task_count(inputs.len(), num_generations),
        "fanning out generation tasks"
    );

    let outputs = match strategy {
        FanOutStrategy::NativeCount => {
            let tasks = inputs
                .iter()
                .map(|input| backend.agenerate(input, num_generations, kwargs));
            try_join_all(tasks).await
        }
        FanOutStrategy::RepeatedCall => {
            let tasks = inputs.iter().flat_map(|input| {
                (0..num_generations).map(move |_| backend.agenerate(input, 1, kwargs))
            });
            try_join_all(tasks)
                .await
                .and_then(|fragments| group_fragments(fragments, inputs.len(), num_generations))
        }
    };

    outputs.inspect_err(|err| {
        tracing::warn!(
            model = backend.model_name(),
            error = %err,
            "generation task failed, discarding the whole batch"
        );
    })
}

pub(crate) fn check_num_generations(num_generations: usize) -> Result<(), GenerationError> {
    if num_generations == 0 {
        return Err(GenerationError::InvalidRequest(
            "num_generations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Regroups flat `input-major` fragments into one merged result per input.
fn group_fragments(
    fragments: Vec<GenerationResult>,
    num_inputs: usize,
    num_generations: usize,
) -> Result<GenerationBatchResult, GenerationError> {
    let mut fragments = fragments.into_iter();
    let mut outputs = Vec::with_capacity(num_inputs);
    for _ in 0..num_inputs {
        let group: Vec<_> = fragments.by_ref().take(num_generations).collect();
        if let Some(merged) = try_merge_responses(group)? {
            outputs.push(merged);
        }
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::ModelBackend;
    use crate::llm::types::INPUT_TOKENS;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the input and records the generation count it was asked for.
    #[derive(Default)]
    struct Echo {
        calls: AtomicUsize,
        requested: Mutex<Vec<usize>>,
    }

    impl ModelBackend for Echo {
        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[async_trait]
    impl AsyncBackend for Echo {
        async fn agenerate(
            &self,
            input: &FormattedInput,
            num_generations: usize,
            _kwargs: &GenerationKwargs,
        ) -> Result<GenerationResult, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(num_generations);
            if input.last_content() == Some("boom") {
                return Err(GenerationError::provider("boom"));
            }
            let text = input.last_content().unwrap_or_default();
            Ok(
                GenerationResult::from_generations(vec![text; num_generations])
                    .with_statistic(INPUT_TOKENS, vec![1; num_generations]),
            )
        }
    }

    fn inputs(contents: &[&str]) -> Vec<FormattedInput> {
        contents.iter().map(|c| FormattedInput::user(*c)).collect()
    }

    #[test]
    fn task_count_per_strategy() {
        assert_eq!(FanOutStrategy::NativeCount.task_count(4, 3), 4);
        assert_eq!(FanOutStrategy::RepeatedCall.task_count(4, 3), 12);
    }

    #[tokio::test]
    async fn native_count_issues_one_call_per_input() {
        let backend = Echo::default();
        let outputs = agenerate_batch(
            &backend,
            FanOutStrategy::NativeCount,
            &inputs(&["a", "b"]),
            3,
            &GenerationKwargs::new(),
        )
        .await
        .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*backend.requested.lock().unwrap(), vec![3, 3]);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].generations, vec![Some("b".to_string()); 3]);
    }

    #[tokio::test]
    async fn repeated_call_merges_per_input() {
        let backend = Echo::default();
        let outputs = agenerate_batch(
            &backend,
            FanOutStrategy::RepeatedCall,
            &inputs(&["a", "b"]),
            3,
            &GenerationKwargs::new(),
        )
        .await
        .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
        assert!(backend.requested.lock().unwrap().iter().all(|&n| n == 1));
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].generations, vec![Some("a".to_string()); 3]);
        assert_eq!(outputs[1].statistic(INPUT_TOKENS), Some(&[1, 1, 1][..]));
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let backend = Echo::default();
        let result = agenerate_batch(
            &backend,
            FanOutStrategy::RepeatedCall,
            &inputs(&["a", "boom", "c"]),
            2,
            &GenerationKwargs::new(),
        )
        .await;

        assert!(matches!(result, Err(GenerationError::Provider { .. })));
    }

    #[tokio::test]
    async fn zero_generations_rejected_for_both_strategies() {
        for strategy in [FanOutStrategy::NativeCount, FanOutStrategy::RepeatedCall] {
            let backend = Echo::default();
            let result = agenerate_batch(
                &backend,
                strategy,
                &inputs(&["a", "b"]),
                0,
                &GenerationKwargs::new(),
            )
            .await;

            assert!(
                matches!(result, Err(GenerationError::InvalidRequest(_))),
                "{strategy:?}"
            );
            assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_result() {
        let backend = Echo::default();
        let outputs = agenerate_batch(
            &backend,
            FanOutStrategy::RepeatedCall,
            &[],
            2,
            &GenerationKwargs::new(),
        )
        .await
        .unwrap();

        assert!(outputs.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
