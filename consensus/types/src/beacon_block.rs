use crate::*;
use serde::{Deserialize, Serialize};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The body of a `BeaconBlock`, restricted to the fields block production fills in here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TreeHash)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub graffiti: Graffiti,
    pub execution_payload: ExecutionPayload,
}

/// A block of the beacon chain. Unsigned: signing happens outside of block production.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TreeHash)]
pub struct BeaconBlock {
    pub slot: Slot,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    /// Returns an empty block to be used during genesis.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the `tree_hash_root` of the block.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }
}
