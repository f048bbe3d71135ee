// Clippy lint set-up (disabled in tests)
#![cfg_attr(
    not(test),
    deny(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::let_underscore_must_use
    )
)]

pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;
pub mod state_advance;

pub use per_block_processing::{
    errors::{BlockProcessingError, HeaderInvalid},
    per_block_processing, process_execution_payload, process_randao,
};
pub use per_epoch_processing::{errors::EpochProcessingError, process_epoch as per_epoch_processing};
pub use per_slot_processing::{per_slot_processing, Error as SlotProcessingError};
pub use state_advance::complete_state_advance;
