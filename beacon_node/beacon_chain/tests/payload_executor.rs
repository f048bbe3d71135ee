use async_trait::async_trait;
use beacon_chain::{PayloadExecutor, PayloadStatus};
use execution_layer::engine_api::Error as ApiError;
use execution_layer::merge_transition::MergeTransitionValidator;
use execution_layer::test_utils::MockExecutionEngine;
use execution_layer::{MergeBlockValidator, TerminalDifficulty};
use logging::test_logger;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use types::{ExecutionBlockHash, ExecutionPayload, ExecutionPayloadHeader, Uint256};

/// Answers every merge validation with a fixed outcome, `None` meaning an engine error.
struct StubMergeValidator {
    outcome: Option<PayloadStatus>,
    calls: AtomicUsize,
}

impl StubMergeValidator {
    fn new(outcome: Option<PayloadStatus>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MergeBlockValidator for StubMergeValidator {
    async fn validate_merge_block(
        &self,
        _execution_payload: &ExecutionPayload,
    ) -> Result<PayloadStatus, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .ok_or_else(|| ApiError::RequestFailed("merge validation failed".to_string()))
    }
}

struct Harness {
    engine: Arc<MockExecutionEngine>,
    merge_validator: Arc<StubMergeValidator>,
    executor: PayloadExecutor,
}

impl Harness {
    fn new(merge_outcome: Option<PayloadStatus>) -> Self {
        Self::with_handle(merge_outcome, Handle::current())
    }

    fn with_handle(merge_outcome: Option<PayloadStatus>, handle: Handle) -> Self {
        let engine = Arc::new(MockExecutionEngine::new());
        let merge_validator = StubMergeValidator::new(merge_outcome);
        let executor = PayloadExecutor::new(
            engine.clone(),
            merge_validator.clone(),
            handle,
            test_logger(),
        );

        Self {
            engine,
            merge_validator,
            executor,
        }
    }
}

fn payload() -> ExecutionPayload {
    ExecutionPayload {
        parent_hash: ExecutionBlockHash::repeat_byte(2),
        block_hash: ExecutionBlockHash::repeat_byte(3),
        block_number: 1,
        ..ExecutionPayload::default()
    }
}

/// A header from after the merge, so no merge validation is due.
fn merged_header() -> ExecutionPayloadHeader {
    ExecutionPayloadHeader {
        block_hash: ExecutionBlockHash::repeat_byte(2),
        ..ExecutionPayloadHeader::default()
    }
}

fn pre_merge_header() -> ExecutionPayloadHeader {
    ExecutionPayloadHeader::default()
}

#[tokio::test]
async fn default_payload_is_valid_without_engine_call() {
    let mut harness = Harness::new(Some(PayloadStatus::Valid));

    assert!(harness
        .executor
        .optimistically_execute(&pre_merge_header(), ExecutionPayload::default()));

    let result = harness.executor.execution_result();
    assert_eq!(result.try_get(), Some(PayloadStatus::Valid));
    assert_eq!(result.wait().await, PayloadStatus::Valid);
    assert_eq!(harness.engine.new_payload_calls(), 0);
    assert_eq!(harness.merge_validator.calls(), 0);
}

#[tokio::test]
async fn unexecuted_payload_is_valid() {
    let harness = Harness::new(None);

    assert_eq!(
        harness.executor.execution_result().try_get(),
        Some(PayloadStatus::Valid)
    );
    assert_eq!(harness.engine.new_payload_calls(), 0);
}

#[tokio::test]
async fn one_submission_regardless_of_reads() {
    let mut harness = Harness::new(None);
    harness
        .engine
        .set_new_payload_status(PayloadStatus::Accepted);

    assert!(harness
        .executor
        .optimistically_execute(&merged_header(), payload()));

    let result = harness.executor.execution_result();
    let readers = (0..4)
        .map(|_| {
            let result = result.clone();
            tokio::spawn(async move { result.wait().await })
        })
        .collect::<Vec<_>>();

    for reader in readers {
        assert_eq!(reader.await.unwrap(), PayloadStatus::Accepted);
    }
    assert_eq!(
        harness.executor.execution_result().wait().await,
        PayloadStatus::Accepted
    );
    assert_eq!(harness.engine.new_payload_calls(), 1);
    assert_eq!(harness.engine.submitted_payloads(), vec![payload()]);
    assert_eq!(harness.merge_validator.calls(), 0);
}

#[tokio::test]
async fn result_pending_until_engine_responds() {
    let mut harness = Harness::new(None);
    harness
        .engine
        .set_new_payload_status(PayloadStatus::Syncing);
    let release = harness.engine.hold_new_payload();

    assert!(harness
        .executor
        .optimistically_execute(&merged_header(), payload()));

    let result = harness.executor.execution_result();
    tokio::task::yield_now().await;
    assert_eq!(result.try_get(), None);

    release.send(()).unwrap();
    assert_eq!(result.wait().await, PayloadStatus::Syncing);
    assert_eq!(result.try_get(), Some(PayloadStatus::Syncing));
}

#[tokio::test]
async fn merge_block_adopts_merge_validation() {
    let invalid = PayloadStatus::invalid("Parent PowBlock exceeds terminal total difficulty");
    let mut harness = Harness::new(Some(invalid.clone()));

    assert!(harness
        .executor
        .optimistically_execute(&pre_merge_header(), payload()));

    assert_eq!(harness.executor.execution_result().wait().await, invalid);
    assert_eq!(harness.engine.new_payload_calls(), 1);
    assert_eq!(harness.merge_validator.calls(), 1);
}

#[tokio::test]
async fn merge_validation_only_after_valid_submission() {
    for status in [
        PayloadStatus::Syncing,
        PayloadStatus::Accepted,
        PayloadStatus::Invalid {
            latest_valid_hash: Some(ExecutionBlockHash::zero()),
            validation_error: None,
        },
    ] {
        let mut harness = Harness::new(Some(PayloadStatus::Valid));
        harness.engine.set_new_payload_status(status.clone());

        assert!(harness
            .executor
            .optimistically_execute(&pre_merge_header(), payload()));

        assert_eq!(harness.executor.execution_result().wait().await, status);
        assert_eq!(harness.merge_validator.calls(), 0);
    }
}

#[tokio::test]
async fn merge_validation_skipped_after_merge() {
    let mut harness = Harness::new(Some(PayloadStatus::Syncing));

    assert!(harness
        .executor
        .optimistically_execute(&merged_header(), payload()));

    assert_eq!(
        harness.executor.execution_result().wait().await,
        PayloadStatus::Valid
    );
    assert_eq!(harness.merge_validator.calls(), 0);
}

#[tokio::test]
async fn failed_submission_is_failed_execution() {
    let mut harness = Harness::new(Some(PayloadStatus::Valid));
    harness.engine.set_new_payload_error("connection refused");

    assert!(harness
        .executor
        .optimistically_execute(&pre_merge_header(), payload()));

    assert!(harness
        .executor
        .execution_result()
        .wait()
        .await
        .has_failed_execution());
    assert_eq!(harness.merge_validator.calls(), 0);
}

#[tokio::test]
async fn failed_merge_validation_is_failed_execution() {
    let mut harness = Harness::new(None);

    assert!(harness
        .executor
        .optimistically_execute(&pre_merge_header(), payload()));

    assert!(harness
        .executor
        .execution_result()
        .wait()
        .await
        .has_failed_execution());
    assert_eq!(harness.merge_validator.calls(), 1);
}

#[tokio::test]
async fn second_execution_is_refused() {
    let mut harness = Harness::new(None);

    assert!(harness
        .executor
        .optimistically_execute(&merged_header(), payload()));
    assert!(!harness
        .executor
        .optimistically_execute(&merged_header(), payload()));

    assert_eq!(
        harness.executor.execution_result().wait().await,
        PayloadStatus::Valid
    );
    assert_eq!(harness.engine.new_payload_calls(), 1);
}

#[tokio::test]
async fn merge_block_against_pow_chain() {
    let engine = Arc::new(MockExecutionEngine::new());
    let chain = engine.pow_chain(&[90, 120]);
    let validator = Arc::new(MergeTransitionValidator::new(
        engine.clone(),
        TerminalDifficulty::new(Uint256::from(100)),
        test_logger(),
    ));
    let mut executor = PayloadExecutor::new(
        engine.clone(),
        validator,
        Handle::current(),
        test_logger(),
    );

    let merge_payload = ExecutionPayload {
        parent_hash: chain[1].block_hash,
        ..payload()
    };
    assert!(executor.optimistically_execute(&pre_merge_header(), merge_payload));

    assert_eq!(executor.execution_result().wait().await, PayloadStatus::Valid);
    assert_eq!(engine.new_payload_calls(), 1);
    assert_eq!(
        engine.requested_pow_blocks(),
        vec![chain[1].block_hash, chain[0].block_hash]
    );
}

#[test]
fn abandoned_execution_is_failed_execution() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut harness = Harness::with_handle(None, runtime.handle().clone());
    let _release = harness.engine.hold_new_payload();

    assert!(harness
        .executor
        .optimistically_execute(&merged_header(), payload()));
    let result = harness.executor.execution_result();
    assert_eq!(result.try_get(), None);

    // Shutting down the runtime drops the task before it settles.
    drop(runtime);

    assert!(result.try_get().unwrap().has_failed_execution());
    assert!(futures::executor::block_on(result.wait()).has_failed_execution());
}
