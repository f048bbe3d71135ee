//! Ethereum consensus types needed to coordinate block production and payload validation with an
//! execution engine across the merge.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod beacon_block;
pub mod beacon_state;
pub mod chain_spec;
pub mod execution_block_hash;
pub mod execution_payload;
pub mod graffiti;
pub mod pow_block;
pub mod signature_bytes;
pub mod slot_epoch;

pub use crate::beacon_block::{BeaconBlock, BeaconBlockBody};
pub use crate::beacon_state::{BeaconState, Error as BeaconStateError};
pub use crate::chain_spec::{ChainSpec, Config};
pub use crate::execution_block_hash::ExecutionBlockHash;
pub use crate::execution_payload::{
    ExecutionPayload, ExecutionPayloadHeader, Transaction, Transactions,
};
pub use crate::graffiti::{Graffiti, GraffitiString, GRAFFITI_BYTES_LEN};
pub use crate::pow_block::PowBlock;
pub use crate::signature_bytes::{SignatureBytes, SIGNATURE_BYTES_LEN};
pub use crate::slot_epoch::{Epoch, Slot};

pub type Hash256 = ethereum_types::H256;
pub type Uint256 = ethereum_types::U256;
pub type Address = ethereum_types::H160;

pub use safe_arith::{ArithError, SafeArith};
pub use ssz_types::{typenum, FixedVector, VariableList};
pub use tree_hash::TreeHash;
