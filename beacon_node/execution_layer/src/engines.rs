//! Connects the `ExecutionEngineChannel` abstraction to a real engine over JSON-RPC.

use crate::engine_api::{
    BlockByNumberQuery, Error as EngineApiError, ForkchoiceState, ForkchoiceUpdatedResponse,
    PayloadAttributes, PayloadId, LATEST_TAG,
};
use crate::payload_status::{process_payload_status, PayloadStatus};
use crate::{ExecutionEngineChannel, HttpJsonRpc};
use async_trait::async_trait;
use slog::{debug, Logger};
use types::{ExecutionBlockHash, ExecutionPayload, PowBlock};

/// An execution engine reached via `HttpJsonRpc`.
pub struct Engine {
    pub api: HttpJsonRpc,
    log: Logger,
}

impl Engine {
    pub fn new(api: HttpJsonRpc, log: Logger) -> Self {
        Self { api, log }
    }
}

#[async_trait]
impl ExecutionEngineChannel for Engine {
    async fn new_payload(
        &self,
        execution_payload: ExecutionPayload,
    ) -> Result<PayloadStatus, EngineApiError> {
        let block_hash = execution_payload.block_hash;

        debug!(
            self.log,
            "Issuing engine_newPayload";
            "parent_hash" => ?execution_payload.parent_hash,
            "block_hash" => ?block_hash,
            "block_number" => execution_payload.block_number,
        );

        let response = self.api.new_payload_v1(execution_payload).await?;

        process_payload_status(block_hash, response, &self.log)
    }

    async fn get_pow_block(
        &self,
        block_hash: ExecutionBlockHash,
    ) -> Result<Option<PowBlock>, EngineApiError> {
        Ok(self
            .api
            .get_block_by_hash(block_hash)
            .await?
            .map(PowBlock::from))
    }

    async fn get_pow_chain_head(&self) -> Result<PowBlock, EngineApiError> {
        self.api
            .get_block_by_number(BlockByNumberQuery::Tag(LATEST_TAG))
            .await?
            .map(PowBlock::from)
            .ok_or(EngineApiError::ExecutionHeadBlockNotFound)
    }

    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResponse, EngineApiError> {
        debug!(
            self.log,
            "Issuing engine_forkchoiceUpdated";
            "forkchoice_state" => ?forkchoice_state,
            "payload_attributes" => ?payload_attributes,
        );

        self.api
            .forkchoice_updated_v1(forkchoice_state, payload_attributes)
            .await
    }

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, EngineApiError> {
        debug!(
            self.log,
            "Issuing engine_getPayload";
            "payload_id" => ?payload_id,
        );

        self.api.get_payload_v1(payload_id).await
    }
}
