//! Checks that a block correctly triggers the merge, and finds the block that should.

use crate::engine_api::Error as ApiError;
use crate::payload_status::PayloadStatus;
use crate::ExecutionEngineChannel;
use async_trait::async_trait;
use slog::{debug, info, Logger};
use std::sync::Arc;
use types::{ChainSpec, ExecutionBlockHash, ExecutionPayload, PowBlock, Uint256};

/// Compares the accumulated difficulty of PoW blocks against the terminal total difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalDifficulty {
    terminal_total_difficulty: Uint256,
}

impl TerminalDifficulty {
    pub fn new(terminal_total_difficulty: Uint256) -> Self {
        Self {
            terminal_total_difficulty,
        }
    }

    pub fn from_spec(spec: &ChainSpec) -> Self {
        Self::new(spec.terminal_total_difficulty)
    }

    pub fn terminal_total_difficulty(&self) -> Uint256 {
        self.terminal_total_difficulty
    }

    pub fn is_reached(&self, block: &PowBlock) -> bool {
        block.total_difficulty >= self.terminal_total_difficulty
    }

    pub fn is_parent_valid(&self, parent: &PowBlock) -> bool {
        parent.total_difficulty < self.terminal_total_difficulty
    }

    /// ## Consensus-specs equivalent
    ///
    /// `is_valid_terminal_pow_block`
    ///
    /// https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/merge/fork-choice.md
    pub fn is_valid_terminal_pow_block(&self, block: &PowBlock, parent: &PowBlock) -> bool {
        self.is_reached(block) && self.is_parent_valid(parent)
    }
}

/// Decides whether a payload is a legal first post-merge payload.
#[async_trait]
pub trait MergeBlockValidator: Send + Sync {
    async fn validate_merge_block(
        &self,
        execution_payload: &ExecutionPayload,
    ) -> Result<PayloadStatus, ApiError>;
}

/// Validates the merge transition block by looking up its PoW ancestors on an engine.
pub struct MergeTransitionValidator {
    engine: Arc<dyn ExecutionEngineChannel>,
    terminal_difficulty: TerminalDifficulty,
    log: Logger,
}

impl MergeTransitionValidator {
    pub fn new(
        engine: Arc<dyn ExecutionEngineChannel>,
        terminal_difficulty: TerminalDifficulty,
        log: Logger,
    ) -> Self {
        Self {
            engine,
            terminal_difficulty,
            log,
        }
    }
}

#[async_trait]
impl MergeBlockValidator for MergeTransitionValidator {
    /// ## Returns
    ///
    /// - `Valid` if `payload.parent_hash` is the terminal PoW block.
    /// - `Invalid` if that block, or its parent, certainly violates the terminal total difficulty.
    /// - `Syncing` if either block is unknown to the engine.
    /// - `Err(_)` if there was an error connecting to the engine.
    async fn validate_merge_block(
        &self,
        execution_payload: &ExecutionPayload,
    ) -> Result<PayloadStatus, ApiError> {
        let pow_block = match self
            .engine
            .get_pow_block(execution_payload.parent_hash)
            .await?
        {
            Some(block) => block,
            None => {
                debug!(
                    self.log,
                    "Terminal PoW block unknown to engine";
                    "parent_hash" => ?execution_payload.parent_hash,
                );
                return Ok(PayloadStatus::Syncing);
            }
        };

        if !self.terminal_difficulty.is_reached(&pow_block) {
            return Ok(PayloadStatus::invalid(
                "PowBlock has not reached terminal total difficulty",
            ));
        }

        let pow_parent = match self.engine.get_pow_block(pow_block.parent_hash).await? {
            Some(block) => block,
            None => {
                debug!(
                    self.log,
                    "Parent of terminal PoW block unknown to engine";
                    "parent_hash" => ?pow_block.parent_hash,
                );
                return Ok(PayloadStatus::Syncing);
            }
        };

        if !self.terminal_difficulty.is_parent_valid(&pow_parent) {
            return Ok(PayloadStatus::invalid(
                "Parent PowBlock exceeds terminal total difficulty",
            ));
        }

        Ok(PayloadStatus::Valid)
    }
}

/// Used during block production to determine if the merge has been triggered.
///
/// Walks back from the head of the PoW chain until a block that reached the terminal total
/// difficulty has a parent that did not. A genesis block that reached it is terminal as well.
///
/// ## Consensus-specs equivalent
///
/// `get_pow_block_at_terminal_total_difficulty`
///
/// https://github.com/ethereum/consensus-specs/blob/v1.1.5/specs/merge/validator.md
pub async fn get_terminal_pow_block_hash(
    engine: &dyn ExecutionEngineChannel,
    spec: &ChainSpec,
    log: &Logger,
) -> Result<Option<ExecutionBlockHash>, ApiError> {
    let terminal_difficulty = TerminalDifficulty::from_spec(spec);
    let mut block = engine.get_pow_chain_head().await?;

    let hash_opt = loop {
        if !terminal_difficulty.is_reached(&block) {
            // Difficulty only grows along the chain, no ancestor can have reached it either.
            break None;
        }

        if block.is_genesis() {
            break Some(block.block_hash);
        }

        let parent = engine
            .get_pow_block(block.parent_hash)
            .await?
            .ok_or(ApiError::ExecutionBlockNotFound(block.parent_hash))?;

        if parent.block_hash == block.block_hash {
            return Err(ApiError::ParentHashEqualsBlockHash(block.block_hash));
        }

        if terminal_difficulty.is_parent_valid(&parent) {
            break Some(block.block_hash);
        }

        block = parent;
    };

    if let Some(hash) = &hash_opt {
        info!(
            log,
            "Found terminal block hash";
            "terminal_total_difficulty" => ?spec.terminal_total_difficulty,
            "block_hash" => ?hash,
        );
    }

    Ok(hash_opt)
}
