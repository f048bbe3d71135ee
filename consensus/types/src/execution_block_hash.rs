use crate::Hash256;
use serde::{Deserialize, Serialize};
use std::fmt;
use tree_hash::{PackedEncoding, TreeHash};

/// The hash of an execution-layer block.
///
/// Kept distinct from `Hash256` so consensus roots and execution hashes are never confused.
#[derive(Default, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct ExecutionBlockHash(pub Hash256);

impl ExecutionBlockHash {
    pub fn zero() -> Self {
        Self(Hash256::zero())
    }

    pub fn repeat_byte(b: u8) -> Self {
        Self(Hash256::repeat_byte(b))
    }

    pub fn from_root(root: Hash256) -> Self {
        Self(root)
    }

    pub fn into_root(self) -> Hash256 {
        self.0
    }
}

impl TreeHash for ExecutionBlockHash {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        Hash256::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> PackedEncoding {
        self.0.tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        Hash256::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.0.tree_hash_root()
    }
}

impl fmt::Display for ExecutionBlockHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Debug for ExecutionBlockHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl std::str::FromStr for ExecutionBlockHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash256::from_str(s)
            .map(Self)
            .map_err(|e| format!("{:?}", e))
    }
}
