#![deny(clippy::wildcard_imports)]

pub use errors::EpochProcessingError;
use types::{BeaconState, ChainSpec};

pub mod errors;
pub mod resets;

pub use resets::process_randao_mixes_reset;

/// Performs per-epoch processing on some BeaconState.
///
/// Only the resets that carry state into the next epoch are applied: rewards, justification
/// and registry updates are handled elsewhere.
pub fn process_epoch(
    state: &mut BeaconState,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    process_randao_mixes_reset(state, spec)?;

    Ok(())
}
