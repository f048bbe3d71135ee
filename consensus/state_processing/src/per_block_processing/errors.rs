use safe_arith::ArithError;
use types::{BeaconStateError, ExecutionBlockHash, Hash256, Slot};

/// Describes why a block could not be applied to a state.
#[derive(Debug, PartialEq, Clone)]
pub enum BlockProcessingError {
    HeaderInvalid {
        reason: HeaderInvalid,
    },
    ExecutionHashChainIncontiguous {
        expected: ExecutionBlockHash,
        found: ExecutionBlockHash,
    },
    ExecutionRandaoMismatch {
        expected: Hash256,
        found: Hash256,
    },
    ExecutionInvalidTimestamp {
        expected: u64,
        found: u64,
    },
    BeaconStateError(BeaconStateError),
    ArithError(ArithError),
}

#[derive(Debug, PartialEq, Clone)]
pub enum HeaderInvalid {
    StateSlotMismatch { state: Slot, block: Slot },
    ParentBlockRootMismatch { state: Hash256, block: Hash256 },
}

impl From<HeaderInvalid> for BlockProcessingError {
    fn from(reason: HeaderInvalid) -> Self {
        BlockProcessingError::HeaderInvalid { reason }
    }
}

impl From<BeaconStateError> for BlockProcessingError {
    fn from(e: BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}

impl From<ArithError> for BlockProcessingError {
    fn from(e: ArithError) -> Self {
        BlockProcessingError::ArithError(e)
    }
}
