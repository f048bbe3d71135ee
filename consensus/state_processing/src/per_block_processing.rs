use errors::{BlockProcessingError, HeaderInvalid};
use safe_arith::SafeArith;
use types::*;

pub mod errors;

/// Updates the state for a new block, whilst validating that the block is valid.
///
/// Signatures are not verified, and `state` must already be at `block.slot`. On success the
/// block's root becomes the state's latest block root.
pub fn per_block_processing(
    state: &mut BeaconState,
    block: &BeaconBlock,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    process_block_header(state, block)?;

    if is_execution_enabled(state, &block.body.execution_payload) {
        process_execution_payload(state, &block.body.execution_payload, spec)?;
    }

    process_randao(state, block, spec)?;

    state.latest_block_root = block.canonical_root();

    Ok(())
}

/// Checks that `block` builds on the head recorded in `state` at the state's slot.
pub fn process_block_header(
    state: &BeaconState,
    block: &BeaconBlock,
) -> Result<(), BlockProcessingError> {
    if block.slot != state.slot {
        return Err(HeaderInvalid::StateSlotMismatch {
            state: state.slot,
            block: block.slot,
        }
        .into());
    }

    if block.parent_root != state.latest_block_root {
        return Err(HeaderInvalid::ParentBlockRootMismatch {
            state: state.latest_block_root,
            block: block.parent_root,
        }
        .into());
    }

    Ok(())
}

/// Mixes the block's RANDAO reveal into the current epoch's mix.
pub fn process_randao(
    state: &mut BeaconState,
    block: &BeaconBlock,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Update the current epoch RANDAO mix.
    state.update_randao_mix(state.current_epoch(spec), &block.body.randao_reveal)?;

    Ok(())
}

/// Returns `true` if `payload` would complete the merge on `state`.
pub fn is_merge_transition_block(state: &BeaconState, payload: &ExecutionPayload) -> bool {
    !state.is_merge_transition_complete() && !payload.is_default()
}

/// Returns `true` if execution payloads must be processed for `payload` on `state`.
pub fn is_execution_enabled(state: &BeaconState, payload: &ExecutionPayload) -> bool {
    is_merge_transition_block(state, payload) || state.is_merge_transition_complete()
}

/// The timestamp an execution payload produced at `slot` must carry.
pub fn compute_timestamp_at_slot(
    state: &BeaconState,
    slot: Slot,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    slot.as_u64()
        .safe_mul(spec.seconds_per_slot)
        .and_then(|since_genesis| state.genesis_time.safe_add(since_genesis))
}

/// Performs the consensus-side checks on `payload` and records its header in `state`.
///
/// Validity of the payload itself is the execution engine's concern.
pub fn process_execution_payload(
    state: &mut BeaconState,
    payload: &ExecutionPayload,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    if state.is_merge_transition_complete() {
        let expected = state.latest_execution_payload_header.block_hash;
        if payload.parent_hash != expected {
            return Err(BlockProcessingError::ExecutionHashChainIncontiguous {
                expected,
                found: payload.parent_hash,
            });
        }
    }

    let expected_randao = *state.get_randao_mix(state.current_epoch(spec))?;
    if payload.prev_randao != expected_randao {
        return Err(BlockProcessingError::ExecutionRandaoMismatch {
            expected: expected_randao,
            found: payload.prev_randao,
        });
    }

    let expected_timestamp = compute_timestamp_at_slot(state, state.slot, spec)?;
    if payload.timestamp != expected_timestamp {
        return Err(BlockProcessingError::ExecutionInvalidTimestamp {
            expected: expected_timestamp,
            found: payload.timestamp,
        });
    }

    state.latest_execution_payload_header = ExecutionPayloadHeader::from(payload);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complete_state_advance;

    fn state_at(slot: u64) -> (BeaconState, ChainSpec) {
        let spec = ChainSpec::minimal();
        let mut state = BeaconState::new(1_000, 16, Hash256::repeat_byte(4), &spec);
        complete_state_advance(&mut state, Slot::new(slot), &spec).unwrap();
        (state, spec)
    }

    fn payload_for(state: &BeaconState, spec: &ChainSpec) -> ExecutionPayload {
        ExecutionPayload {
            parent_hash: state.latest_execution_payload_header.block_hash,
            block_hash: ExecutionBlockHash::repeat_byte(0xaa),
            prev_randao: *state.get_randao_mix(state.current_epoch(spec)).unwrap(),
            timestamp: compute_timestamp_at_slot(state, state.slot, spec).unwrap(),
            ..ExecutionPayload::default()
        }
    }

    #[test]
    fn timestamp_at_slot() {
        let (state, spec) = state_at(0);
        assert_eq!(
            compute_timestamp_at_slot(&state, Slot::new(3), &spec),
            Ok(1_000 + 3 * spec.seconds_per_slot)
        );
    }

    #[test]
    fn pre_merge_block_with_empty_payload() {
        let (mut state, spec) = state_at(1);
        let block = BeaconBlock {
            slot: Slot::new(1),
            parent_root: state.latest_block_root,
            ..BeaconBlock::empty()
        };

        per_block_processing(&mut state, &block, &spec).unwrap();
        assert!(!state.is_merge_transition_complete());
        assert_eq!(state.latest_block_root, block.canonical_root());
    }

    #[test]
    fn merge_block_records_header() {
        let (mut state, spec) = state_at(2);
        let payload = payload_for(&state, &spec);
        assert!(is_merge_transition_block(&state, &payload));

        process_execution_payload(&mut state, &payload, &spec).unwrap();
        assert!(state.is_merge_transition_complete());
        assert_eq!(
            state.latest_execution_payload_header.block_hash,
            payload.block_hash
        );
    }

    #[test]
    fn post_merge_payload_must_extend_previous() {
        let (mut state, spec) = state_at(2);
        let payload = payload_for(&state, &spec);
        process_execution_payload(&mut state, &payload, &spec).unwrap();

        let mut next = payload_for(&state, &spec);
        next.parent_hash = ExecutionBlockHash::repeat_byte(0xbb);
        assert_eq!(
            process_execution_payload(&mut state, &next, &spec),
            Err(BlockProcessingError::ExecutionHashChainIncontiguous {
                expected: payload.block_hash,
                found: next.parent_hash,
            })
        );
    }

    #[test]
    fn payload_timestamp_is_checked() {
        let (mut state, spec) = state_at(2);
        let mut payload = payload_for(&state, &spec);
        payload.timestamp += 1;

        assert!(matches!(
            process_execution_payload(&mut state, &payload, &spec),
            Err(BlockProcessingError::ExecutionInvalidTimestamp { .. })
        ));
    }

    #[test]
    fn header_slot_mismatch() {
        let (mut state, spec) = state_at(1);
        let block = BeaconBlock {
            slot: Slot::new(2),
            parent_root: state.latest_block_root,
            ..BeaconBlock::empty()
        };

        assert_eq!(
            per_block_processing(&mut state, &block, &spec),
            Err(BlockProcessingError::HeaderInvalid {
                reason: HeaderInvalid::StateSlotMismatch {
                    state: Slot::new(1),
                    block: Slot::new(2),
                }
            })
        );
    }
}
