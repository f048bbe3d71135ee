//! Submits the execution payload of a single block to the execution engine, without making block
//! import wait on the answer.
//!
//! A block whose payload has been handed to a `PayloadExecutor` may be applied to fork choice
//! optimistically. Fork choice later reads the settled `PayloadStatus` through an
//! `ExecutionResult`.

use execution_layer::engine_api::Error as ApiError;
use execution_layer::{ExecutionEngineChannel, MergeBlockValidator, PayloadStatus};
use slog::{crit, debug, warn, Logger};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use types::{ExecutionPayload, ExecutionPayloadHeader};

/// `None` until the payload has been validated, then the final status.
type StatusReceiver = watch::Receiver<Option<PayloadStatus>>;

enum ExecutionState {
    NotStarted,
    Started(StatusReceiver),
}

/// A read-only handle onto the outcome of `PayloadExecutor::optimistically_execute`.
///
/// Cloning the handle or reading from it never causes further calls to the execution engine.
#[derive(Clone)]
pub struct ExecutionResult {
    receiver: StatusReceiver,
}

impl ExecutionResult {
    fn settled(status: PayloadStatus) -> Self {
        let (_sender, receiver) = watch::channel(Some(status));
        Self { receiver }
    }

    /// Returns the status if it is already known, without waiting.
    pub fn try_get(&self) -> Option<PayloadStatus> {
        if let Some(status) = self.receiver.borrow().clone() {
            return Some(status);
        }

        // The sender is gone without ever writing a status.
        if self.receiver.has_changed().is_err() {
            return Some(abandoned());
        }

        None
    }

    /// Waits until the status is known.
    pub async fn wait(&self) -> PayloadStatus {
        let mut receiver = self.receiver.clone();
        loop {
            if let Some(status) = receiver.borrow_and_update().clone() {
                return status;
            }

            if receiver.changed().await.is_err() {
                return receiver.borrow().clone().unwrap_or_else(abandoned);
            }
        }
    }
}

fn abandoned() -> PayloadStatus {
    PayloadStatus::failed_execution("payload execution task was dropped before completing")
}

/// Drives the validation of one block's execution payload.
///
/// ## State machine
///
/// `NotStarted -> Started(pending) -> Started(settled)`. The settled status is written exactly once
/// and never changes afterwards.
pub struct PayloadExecutor {
    engine: Arc<dyn ExecutionEngineChannel>,
    merge_block_validator: Arc<dyn MergeBlockValidator>,
    executor: Handle,
    state: ExecutionState,
    log: Logger,
}

impl PayloadExecutor {
    pub fn new(
        engine: Arc<dyn ExecutionEngineChannel>,
        merge_block_validator: Arc<dyn MergeBlockValidator>,
        executor: Handle,
        log: Logger,
    ) -> Self {
        Self {
            engine,
            merge_block_validator,
            executor,
            state: ExecutionState::NotStarted,
            log,
        }
    }

    /// Starts validating `payload` and returns without waiting for the execution engine.
    ///
    /// `latest_header` is the execution payload header of the block's pre-state. When it is the
    /// default header the block is the merge transition block, and a `Valid` payload must also
    /// pass `MergeBlockValidator::validate_merge_block`.
    ///
    /// Returns `true` when the payload was accepted for validation, which says nothing about its
    /// validity. Returns `false` if this executor was already used.
    pub fn optimistically_execute(
        &mut self,
        latest_header: &ExecutionPayloadHeader,
        payload: ExecutionPayload,
    ) -> bool {
        if let ExecutionState::Started(_) = self.state {
            crit!(
                self.log,
                "Payload executed twice";
                "msg" => "this is a bug, each block requires its own executor",
                "block_hash" => ?payload.block_hash,
            );
            return false;
        }

        if payload.is_default() {
            let settled = ExecutionResult::settled(PayloadStatus::Valid);
            self.state = ExecutionState::Started(settled.receiver);
            return true;
        }

        let (sender, receiver) = watch::channel(None);
        let is_merge_block = latest_header.is_default();
        let engine = self.engine.clone();
        let merge_block_validator = self.merge_block_validator.clone();
        let log = self.log.clone();

        self.executor.spawn(async move {
            let status = execute_payload(
                engine.as_ref(),
                merge_block_validator.as_ref(),
                is_merge_block,
                payload,
                &log,
            )
            .await;
            sender.send_replace(Some(status));
        });

        self.state = ExecutionState::Started(receiver);
        true
    }

    /// Returns a handle onto the validation outcome.
    ///
    /// If `optimistically_execute` was never called there is no payload to validate, and the
    /// result is `Valid`.
    pub fn execution_result(&self) -> ExecutionResult {
        match &self.state {
            ExecutionState::NotStarted => ExecutionResult::settled(PayloadStatus::Valid),
            ExecutionState::Started(receiver) => ExecutionResult {
                receiver: receiver.clone(),
            },
        }
    }
}

async fn execute_payload(
    engine: &dyn ExecutionEngineChannel,
    merge_block_validator: &dyn MergeBlockValidator,
    is_merge_block: bool,
    payload: ExecutionPayload,
    log: &Logger,
) -> PayloadStatus {
    let block_hash = payload.block_hash;
    let merge_payload = is_merge_block.then(|| payload.clone());

    let result: Result<PayloadStatus, ApiError> = match engine.new_payload(payload).await {
        Ok(PayloadStatus::Valid) => match merge_payload {
            Some(payload) => merge_block_validator.validate_merge_block(&payload).await,
            None => Ok(PayloadStatus::Valid),
        },
        other => other,
    };

    match result {
        Ok(status) => {
            if status.is_invalid() {
                debug!(
                    log,
                    "Invalid execution payload";
                    "status" => ?status,
                    "block_hash" => ?block_hash,
                    "is_merge_block" => is_merge_block,
                );
            }
            status
        }
        Err(e) => {
            warn!(
                log,
                "Failed to execute payload";
                "error" => ?e,
                "block_hash" => ?block_hash,
            );
            PayloadStatus::failed_execution(e)
        }
    }
}
