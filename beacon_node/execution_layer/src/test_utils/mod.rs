//! Provides an in-memory execution engine for testing consensus-layer components.

use crate::engine_api::{
    Error as ApiError, ForkchoiceState, ForkchoiceUpdatedResponse, PayloadAttributes, PayloadId,
    PayloadStatusV1, PayloadStatusV1Status,
};
use crate::{ExecutionEngineChannel, PayloadStatus};
use async_trait::async_trait;
use ethereum_hashing::hash_fixed;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;
use types::{ExecutionBlockHash, ExecutionPayload, Hash256, PowBlock, Uint256};

/// The error code an engine uses for an unknown payload id.
pub const UNKNOWN_PAYLOAD_ERROR_CODE: i64 = -38001;

/// What `MockExecutionEngine::new_payload` should answer.
#[derive(Debug, Clone)]
pub enum NewPayloadResponse {
    Status(PayloadStatus),
    /// Fail the call as if the engine could not be reached.
    Error(String),
}

struct MockState {
    blocks: HashMap<ExecutionBlockHash, PowBlock>,
    head_block_hash: Option<ExecutionBlockHash>,
    new_payload_response: NewPayloadResponse,
    new_payload_gate: Option<oneshot::Receiver<()>>,
    get_pow_block_error: Option<String>,
    requested_pow_blocks: Vec<ExecutionBlockHash>,
    submitted_payloads: Vec<ExecutionPayload>,
    payloads: HashMap<PayloadId, ExecutionPayload>,
    next_payload_id: u64,
}

/// A programmable `ExecutionEngineChannel`.
///
/// Holds a PoW chain, answers `new_payload` with a scripted response and counts every call.
pub struct MockExecutionEngine {
    state: Mutex<MockState>,
    new_payload_calls: AtomicUsize,
    get_pow_block_calls: AtomicUsize,
    forkchoice_updated_calls: AtomicUsize,
    get_payload_calls: AtomicUsize,
}

impl Default for MockExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutionEngine {
    /// An engine without any PoW blocks that considers every payload `Valid`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                blocks: HashMap::new(),
                head_block_hash: None,
                new_payload_response: NewPayloadResponse::Status(PayloadStatus::Valid),
                new_payload_gate: None,
                get_pow_block_error: None,
                requested_pow_blocks: vec![],
                submitted_payloads: vec![],
                payloads: HashMap::new(),
                next_payload_id: 1,
            }),
            new_payload_calls: AtomicUsize::new(0),
            get_pow_block_calls: AtomicUsize::new(0),
            forkchoice_updated_calls: AtomicUsize::new(0),
            get_payload_calls: AtomicUsize::new(0),
        }
    }

    /// Inserts `block` and makes it the head of the PoW chain.
    pub fn insert_pow_block(&self, block: PowBlock) {
        let mut state = self.state.lock();
        state.head_block_hash = Some(block.block_hash);
        state.blocks.insert(block.block_hash, block);
    }

    pub fn remove_pow_block(&self, block_hash: ExecutionBlockHash) -> Option<PowBlock> {
        self.state.lock().blocks.remove(&block_hash)
    }

    /// Builds a PoW chain with one block per entry of `total_difficulties`, starting at genesis.
    ///
    /// The last block becomes the head.
    pub fn pow_chain(&self, total_difficulties: &[u64]) -> Vec<PowBlock> {
        let mut parent_hash = ExecutionBlockHash::zero();

        total_difficulties
            .iter()
            .enumerate()
            .map(|(i, total_difficulty)| {
                let block_number = i as u64;
                let block = PowBlock {
                    block_hash: pow_block_hash(block_number),
                    parent_hash,
                    total_difficulty: Uint256::from(*total_difficulty),
                    block_number,
                    timestamp: block_number * 13,
                };
                parent_hash = block.block_hash;
                self.insert_pow_block(block);
                block
            })
            .collect()
    }

    pub fn set_new_payload_response(&self, response: NewPayloadResponse) {
        self.state.lock().new_payload_response = response;
    }

    pub fn set_new_payload_status(&self, status: PayloadStatus) {
        self.set_new_payload_response(NewPayloadResponse::Status(status))
    }

    pub fn set_new_payload_error(&self, error: impl Into<String>) {
        self.set_new_payload_response(NewPayloadResponse::Error(error.into()))
    }

    /// Makes every `get_pow_block` call fail while set.
    pub fn set_get_pow_block_error(&self, error: Option<String>) {
        self.state.lock().get_pow_block_error = error;
    }

    /// Holds the next `new_payload` call pending until the returned sender fires or is dropped.
    pub fn hold_new_payload(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().new_payload_gate = Some(rx);
        tx
    }

    /// The hashes passed to `get_pow_block`, in order.
    pub fn requested_pow_blocks(&self) -> Vec<ExecutionBlockHash> {
        self.state.lock().requested_pow_blocks.clone()
    }

    pub fn submitted_payloads(&self) -> Vec<ExecutionPayload> {
        self.state.lock().submitted_payloads.clone()
    }

    /// The id under which an identical payload was built, if any.
    pub fn payload_id_for(&self, payload: &ExecutionPayload) -> Option<PayloadId> {
        self.state
            .lock()
            .payloads
            .iter()
            .find(|(_, built)| *built == payload)
            .map(|(id, _)| *id)
    }

    pub fn new_payload_calls(&self) -> usize {
        self.new_payload_calls.load(Ordering::SeqCst)
    }

    pub fn get_pow_block_calls(&self) -> usize {
        self.get_pow_block_calls.load(Ordering::SeqCst)
    }

    pub fn forkchoice_updated_calls(&self) -> usize {
        self.forkchoice_updated_calls.load(Ordering::SeqCst)
    }

    pub fn get_payload_calls(&self) -> usize {
        self.get_payload_calls.load(Ordering::SeqCst)
    }

    fn build_payload(
        state: &MockState,
        head_block_hash: ExecutionBlockHash,
        attributes: &PayloadAttributes,
    ) -> ExecutionPayload {
        let block_number = state
            .blocks
            .get(&head_block_hash)
            .map_or(0, |parent| parent.block_number + 1);

        let mut preimage = head_block_hash.into_root().as_bytes().to_vec();
        preimage.extend_from_slice(&attributes.timestamp.to_le_bytes());
        preimage.extend_from_slice(attributes.prev_randao.as_bytes());
        preimage.extend_from_slice(attributes.suggested_fee_recipient.as_bytes());

        ExecutionPayload {
            parent_hash: head_block_hash,
            fee_recipient: attributes.suggested_fee_recipient,
            prev_randao: attributes.prev_randao,
            block_number,
            gas_limit: 30_000_000,
            timestamp: attributes.timestamp,
            base_fee_per_gas: Uint256::from(7),
            block_hash: ExecutionBlockHash::from_root(Hash256::from(hash_fixed(&preimage))),
            ..ExecutionPayload::default()
        }
    }
}

fn pow_block_hash(block_number: u64) -> ExecutionBlockHash {
    ExecutionBlockHash::from_root(Hash256::from_low_u64_be(block_number + 1))
}

#[async_trait]
impl ExecutionEngineChannel for MockExecutionEngine {
    async fn new_payload(
        &self,
        execution_payload: ExecutionPayload,
    ) -> Result<PayloadStatus, ApiError> {
        self.new_payload_calls.fetch_add(1, Ordering::SeqCst);

        let gate = {
            let mut state = self.state.lock();
            state.submitted_payloads.push(execution_payload);
            state.new_payload_gate.take()
        };

        if let Some(gate) = gate {
            // A dropped sender releases the call as well.
            let _ = gate.await;
        }

        match self.state.lock().new_payload_response.clone() {
            NewPayloadResponse::Status(status) => Ok(status),
            NewPayloadResponse::Error(message) => Err(ApiError::RequestFailed(message)),
        }
    }

    async fn get_pow_block(
        &self,
        block_hash: ExecutionBlockHash,
    ) -> Result<Option<PowBlock>, ApiError> {
        self.get_pow_block_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        state.requested_pow_blocks.push(block_hash);

        if let Some(message) = &state.get_pow_block_error {
            return Err(ApiError::RequestFailed(message.clone()));
        }

        Ok(state.blocks.get(&block_hash).copied())
    }

    async fn get_pow_chain_head(&self) -> Result<PowBlock, ApiError> {
        let state = self.state.lock();
        state
            .head_block_hash
            .and_then(|hash| state.blocks.get(&hash).copied())
            .ok_or(ApiError::ExecutionHeadBlockNotFound)
    }

    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResponse, ApiError> {
        self.forkchoice_updated_calls.fetch_add(1, Ordering::SeqCst);

        let payload_id = payload_attributes.map(|attributes| {
            let mut state = self.state.lock();
            let payload =
                Self::build_payload(&state, forkchoice_state.head_block_hash, &attributes);
            let id = state.next_payload_id.to_be_bytes();
            state.next_payload_id += 1;
            state.payloads.insert(id, payload);
            id
        });

        Ok(ForkchoiceUpdatedResponse {
            payload_status: PayloadStatusV1 {
                status: PayloadStatusV1Status::Valid,
                latest_valid_hash: Some(forkchoice_state.head_block_hash),
                validation_error: None,
            },
            payload_id,
        })
    }

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, ApiError> {
        self.get_payload_calls.fetch_add(1, Ordering::SeqCst);

        self.state
            .lock()
            .payloads
            .get(&payload_id)
            .cloned()
            .ok_or_else(|| ApiError::ServerMessage {
                code: UNKNOWN_PAYLOAD_ERROR_CODE,
                message: "Unknown payload".to_string(),
            })
    }
}
