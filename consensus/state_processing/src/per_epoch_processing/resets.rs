use super::errors::EpochProcessingError;
use types::{BeaconState, ChainSpec, SafeArith};

/// Seeds the next epoch's RANDAO mix with the current one.
pub fn process_randao_mixes_reset(
    state: &mut BeaconState,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    let current_epoch = state.current_epoch(spec);
    let next_epoch = current_epoch.safe_add(1)?;
    state.set_randao_mix(next_epoch, *state.get_randao_mix(current_epoch)?)?;
    Ok(())
}
