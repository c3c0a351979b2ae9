//! The process-wide interrupt flag stops offline polling.
//!
//! The flag is global, so this binary holds a single test.


use std::sync::atomic::Ordering;
use synthgen_models::llm::{
    Backend, CancellationToken, GenerationError, GenerationKwargs, Llm, LlmConfig,
    process_interrupt_requested, request_process_interrupt,
};
use test_utils::{OfflineStub, user_inputs};

#[test]
fn flag_raised_before_second_wait_stops_polling() {
    assert!(!process_interrupt_requested());

    let stub = OfflineStub::never_done().on_pending(|call| {
        if call == 2 {
            request_process_interrupt();
        }
    });
    let expected_jobs = stub.jobs.clone();
    let calls = stub.calls.clone();
    let config = LlmConfig::new()
        .with_offline_batch_generation(true)
        .with_block_until_done(0);
    let mut llm = Llm::new(Backend::sync(stub), config);

    let err = llm
        .generate_outputs(&user_inputs(&["a"]), 1, &GenerationKwargs::new())
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(matches!(
        err,
        GenerationError::OfflineBatchNotFinished { ref jobs_ids } if *jobs_ids == expected_jobs
    ));

    // Only tokens watching the flag observe it.
    assert!(CancellationToken::watching_process_flag().is_cancelled());
    assert!(!CancellationToken::new().is_cancelled());
}
