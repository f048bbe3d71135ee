use crate::*;
use safe_arith::ArithError;
use types::*;

#[derive(Debug, PartialEq)]
pub enum Error {
    BeaconStateError(BeaconStateError),
    EpochProcessingError(EpochProcessingError),
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Self::ArithError(e)
    }
}

/// Advances a state forward by one slot, performing per-epoch processing if required.
///
/// Returns `true` if epoch processing ran.
pub fn per_slot_processing(state: &mut BeaconState, spec: &ChainSpec) -> Result<bool, Error> {
    cache_state(state)?;

    let epoch_processed = if state
        .slot
        .safe_add(1)?
        .safe_rem(spec.slots_per_epoch)?
        == 0
    {
        per_epoch_processing(state, spec)?;
        true
    } else {
        false
    };

    state.slot = state.slot.safe_add(1)?;

    Ok(epoch_processed)
}

fn cache_state(state: &mut BeaconState) -> Result<(), Error> {
    // Note: increment the state slot here to allow use of our `block_root` setter.
    let previous_slot = state.slot;
    state.slot = state.slot.safe_add(1)?;

    // Cache block root
    let latest_block_root = state.latest_block_root;
    state.set_block_root(previous_slot, latest_block_root)?;

    // Set the state slot back to what it should be.
    state.slot = previous_slot;

    Ok(())
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<EpochProcessingError> for Error {
    fn from(e: EpochProcessingError) -> Error {
        Error::EpochProcessingError(e)
    }
}
