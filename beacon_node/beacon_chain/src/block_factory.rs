use crate::operation_selector::BlockOperationSelector;
use crate::state_transition::StateTransition;
use crate::BlockProductionError;
use slog::{debug, Logger};
use std::sync::Arc;
use types::*;

/// Produces unsigned blocks.
///
/// Which operations end up in a block is left to the `BlockOperationSelector`, the state
/// transition to `T`.
pub struct BlockFactory<T: StateTransition> {
    state_transition: T,
    operation_selector: Arc<dyn BlockOperationSelector>,
    log: Logger,
}

impl<T: StateTransition> BlockFactory<T> {
    pub fn new(
        state_transition: T,
        operation_selector: Arc<dyn BlockOperationSelector>,
        log: Logger,
    ) -> Self {
        Self {
            state_transition,
            operation_selector,
            log,
        }
    }

    /// Produce a block at `new_slot` on top of `previous_state`.
    ///
    /// `block_slot_state` may supply `previous_state` already advanced to `new_slot`, which saves
    /// the slot processing.
    ///
    /// ## Errors
    ///
    /// - `BlockSlotStateMismatch` if `block_slot_state` is not at `new_slot`.
    /// - `ArithError` if `new_slot` is the genesis slot, which has no parent.
    /// - Any error from advancing the state or assembling the block.
    pub async fn create_unsigned_block(
        &self,
        previous_state: &BeaconState,
        block_slot_state: Option<BeaconState>,
        new_slot: Slot,
        randao_reveal: SignatureBytes,
        graffiti: Option<Graffiti>,
    ) -> Result<BeaconBlock, BlockProductionError> {
        if let Some(state) = &block_slot_state {
            if state.slot != new_slot {
                return Err(BlockProductionError::BlockSlotStateMismatch {
                    block_slot_state: state.slot,
                    new_slot,
                });
            }
        }

        let parent_slot = new_slot.safe_sub(1)?;

        let state = match block_slot_state {
            Some(state) => state,
            None => {
                let mut state = previous_state.clone();
                if state.slot != parent_slot {
                    self.state_transition.process_slots(&mut state, parent_slot)?;
                }
                self.state_transition.process_slots(&mut state, new_slot)?;
                state
            }
        };

        let parent_root = self
            .state_transition
            .block_root_at_slot(&state, parent_slot)?;
        let proposer_index = self.state_transition.proposer_index(&state, new_slot)?;

        let body_selector = self.operation_selector.create_selector(
            parent_root,
            &state,
            randao_reveal,
            graffiti,
        );

        let (block, _post_state) = self
            .state_transition
            .assemble_block(new_slot, proposer_index, state, parent_root, body_selector)
            .await?;

        debug!(
            self.log,
            "Produced unsigned block";
            "slot" => %block.slot,
            "proposer_index" => block.proposer_index,
            "parent_root" => ?block.parent_root,
            "execution_block_hash" => ?block.body.execution_payload.block_hash,
            "graffiti" => block.body.graffiti.as_utf8_lossy(),
        );

        Ok(block)
    }

    /// Lets the operation selector start work for a block at `target_slot` ahead of time.
    pub fn prepare_execution_payload(
        &self,
        current_state: Option<&BeaconState>,
        target_slot: Slot,
    ) {
        self.operation_selector
            .prepare_execution_payload(current_state, target_slot)
    }
}
