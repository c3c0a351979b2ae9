//! Integration tests for offline batch generation and polling.


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use synthgen_models::llm::{
    Backend, CancellationToken, GenerationError, GenerationKwargs, JobIds, Llm, LlmConfig,
};
use test_utils::{BrokenOffline, OfflineStub, user_inputs};

fn offline_config() -> LlmConfig {
    LlmConfig::new().with_offline_batch_generation(true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn offline_disabled_uses_online_generation() {
    let stub = OfflineStub::new(0);
    let calls = stub.calls.clone();
    let mut llm = Llm::new(Backend::sync(stub), LlmConfig::default());

    let outputs = llm
        .generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap();

    assert_eq!(outputs[0].generations, vec![Some("online".to_string())]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn without_interval_a_pending_batch_surfaces_its_jobs() {
    let stub = OfflineStub::new(1);
    let expected_jobs = stub.jobs.clone();
    let submissions = stub.submissions.clone();
    let mut llm = Llm::new(Backend::sync(stub), offline_config());
    let inputs = user_inputs(&["a", "b"]);

    let err = llm
        .generate_outputs(&inputs, 1, &GenerationKwargs::new())
        .unwrap_err();
    assert!(err.is_not_finished());
    assert_eq!(err.jobs_ids(), Some(&expected_jobs));
    assert_eq!(llm.jobs_ids(), Some(&expected_jobs));

    // The next run retrieves the same jobs instead of resubmitting.
    let outputs = llm
        .generate_outputs(&inputs, 1, &GenerationKwargs::new())
        .unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(submissions.load(Ordering::SeqCst), 1);
}

#[test]
fn persisted_jobs_resume_without_resubmitting() {
    let stub = OfflineStub::new(0);
    let submissions = stub.submissions.clone();
    let seen = stub.seen_jobs.clone();
    let persisted = JobIds::new(["batch_from_last_run"]);

    let config = offline_config().with_jobs_ids(persisted.clone());
    let mut llm = Llm::new(Backend::sync(stub), config);

    llm.generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap();

    assert_eq!(submissions.load(Ordering::SeqCst), 0);
    assert_eq!(*seen.lock().unwrap(), vec![Some(persisted)]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Polling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn polling_returns_after_three_invocations() {
    let stub = OfflineStub::new(2);
    let calls = stub.calls.clone();
    let mut llm = Llm::new(Backend::sync(stub), offline_config().with_block_until_done(0))
        .with_cancellation(CancellationToken::new());

    let outputs = llm
        .generate_outputs(&user_inputs(&["a", "b"]), 2, &GenerationKwargs::new())
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[1].generations, vec![Some("offline".to_string()); 2]);
}

#[test]
fn direct_interrupt_stops_a_long_wait() {
    let stub = OfflineStub::never_done();
    let expected_jobs = stub.jobs.clone();
    let token = CancellationToken::new();
    let mut llm = Llm::new(Backend::sync(stub), offline_config().with_block_until_done(3600))
        .with_cancellation(token.clone());

    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let start = Instant::now();
    let err = llm
        .generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap_err();
    interrupter.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(matches!(
        err,
        GenerationError::OfflineBatchNotFinished { ref jobs_ids } if *jobs_ids == expected_jobs
    ));
    assert_eq!(llm.jobs_ids(), Some(&expected_jobs));
}

#[test]
fn cancellation_observed_before_the_next_wait() {
    let token = CancellationToken::new();
    let stub = OfflineStub::never_done().on_pending({
        let token = token.clone();
        move |call| {
            if call == 2 {
                token.cancel();
            }
        }
    });
    let calls = stub.calls.clone();
    let mut llm = Llm::new(Backend::sync(stub), offline_config().with_block_until_done(0))
        .with_cancellation(token);

    let err = llm
        .generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap_err();

    assert!(err.is_not_finished());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn other_errors_are_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = BrokenOffline {
        calls: calls.clone(),
    };
    let mut llm = Llm::new(Backend::sync(backend), offline_config().with_block_until_done(0))
        .with_cancellation(CancellationToken::new());

    let err = llm
        .generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap_err();

    assert!(matches!(err, GenerationError::Provider { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cancelled_token_keeps_stopping_polls_until_reset() {
    let stub = OfflineStub::new(3);
    let calls = stub.calls.clone();
    let submissions = stub.submissions.clone();
    let token = CancellationToken::new();
    let mut llm = Llm::new(Backend::sync(stub), offline_config().with_block_until_done(0))
        .with_cancellation(token.clone());
    let inputs = user_inputs(&["a"]);

    token.cancel();
    for expected_calls in 1..=2 {
        let err = llm
            .generate_outputs(&inputs, 1, &GenerationKwargs::new())
            .unwrap_err();
        assert!(err.is_not_finished());
        assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
    }

    llm.cancellation().reset();
    let outputs = llm
        .generate_outputs(&inputs, 1, &GenerationKwargs::new())
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(submissions.load(Ordering::SeqCst), 1);
    assert_eq!(outputs.len(), 1);
}
