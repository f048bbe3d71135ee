#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod block_factory;
mod errors;
pub mod operation_selector;
pub mod payload_executor;
pub mod state_transition;

pub use self::block_factory::BlockFactory;
pub use self::errors::BlockProductionError;
pub use self::operation_selector::{
    BlockOperationSelector, BodySelector, DefaultOperationSelector, ExecutionOperationSelector,
};
pub use self::payload_executor::{ExecutionResult, PayloadExecutor};
pub use self::state_transition::{SpecStateTransition, StateTransition};
pub use execution_layer::{self, PayloadStatus};
pub use state_processing;
pub use types;
