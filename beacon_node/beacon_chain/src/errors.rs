use execution_layer::Error as ExecutionLayerError;
use state_processing::state_advance::Error as StateAdvanceError;
use state_processing::BlockProcessingError;
use types::*;

macro_rules! easy_from_to {
    ($from: ident, $to: ident) => {
        impl From<$from> for $to {
            fn from(e: $from) -> $to {
                $to::$from(e)
            }
        }
    };
}

#[derive(Debug)]
pub enum BlockProductionError {
    /// The precomputed state handed to block production is not at the slot of the new block.
    BlockSlotStateMismatch {
        block_slot_state: Slot,
        new_slot: Slot,
    },
    StateAdvanceError(StateAdvanceError),
    BlockProcessingError(BlockProcessingError),
    BeaconStateError(BeaconStateError),
    ExecutionLayerError(ExecutionLayerError),
    ArithError(ArithError),
}

easy_from_to!(StateAdvanceError, BlockProductionError);
easy_from_to!(BlockProcessingError, BlockProductionError);
easy_from_to!(BeaconStateError, BlockProductionError);
easy_from_to!(ExecutionLayerError, BlockProductionError);
easy_from_to!(ArithError, BlockProductionError);
