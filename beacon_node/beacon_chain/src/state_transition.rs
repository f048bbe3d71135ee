use crate::operation_selector::BodySelector;
use crate::BlockProductionError;
use async_trait::async_trait;
use state_processing::per_block_processing::{is_execution_enabled, process_block_header};
use state_processing::state_advance::Error as StateAdvanceError;
use state_processing::{complete_state_advance, process_execution_payload, process_randao};
use std::sync::Arc;
use types::*;

/// The state-transition functions that block production relies on.
#[async_trait]
pub trait StateTransition: Send + Sync {
    /// Advances `state` through empty slots until it reaches `slot`.
    fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<(), StateAdvanceError>;

    fn block_root_at_slot(&self, state: &BeaconState, slot: Slot)
        -> Result<Hash256, BeaconStateError>;

    fn proposer_index(&self, state: &BeaconState, slot: Slot) -> Result<u64, BeaconStateError>;

    /// Builds the block at `slot` on top of `state` and returns it with its post-state.
    ///
    /// The block's `state_root` is left zero.
    async fn assemble_block(
        &self,
        slot: Slot,
        proposer_index: u64,
        state: BeaconState,
        parent_root: Hash256,
        body_selector: BodySelector,
    ) -> Result<(BeaconBlock, BeaconState), BlockProductionError>;
}

/// A `StateTransition` backed by the `state_processing` crate.
#[derive(Clone)]
pub struct SpecStateTransition {
    spec: Arc<ChainSpec>,
}

impl SpecStateTransition {
    pub fn new(spec: Arc<ChainSpec>) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }
}

#[async_trait]
impl StateTransition for SpecStateTransition {
    fn process_slots(&self, state: &mut BeaconState, slot: Slot) -> Result<(), StateAdvanceError> {
        complete_state_advance(state, slot, &self.spec)
    }

    fn block_root_at_slot(
        &self,
        state: &BeaconState,
        slot: Slot,
    ) -> Result<Hash256, BeaconStateError> {
        state.get_block_root(slot).copied()
    }

    fn proposer_index(&self, state: &BeaconState, slot: Slot) -> Result<u64, BeaconStateError> {
        state.get_beacon_proposer_index(slot, &self.spec)
    }

    async fn assemble_block(
        &self,
        slot: Slot,
        proposer_index: u64,
        mut state: BeaconState,
        parent_root: Hash256,
        body_selector: BodySelector,
    ) -> Result<(BeaconBlock, BeaconState), BlockProductionError> {
        let body = body_selector.await?;

        let block = BeaconBlock {
            slot,
            proposer_index,
            parent_root,
            state_root: Hash256::zero(),
            body,
        };

        process_block_header(&state, &block)?;

        if is_execution_enabled(&state, &block.body.execution_payload) {
            process_execution_payload(&mut state, &block.body.execution_payload, &self.spec)?;
        }

        process_randao(&mut state, &block, &self.spec)?;

        Ok((block, state))
    }
}
