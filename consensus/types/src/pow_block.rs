use crate::*;

/// A proof-of-work block as reported by the execution engine.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct PowBlock {
    pub block_hash: ExecutionBlockHash,
    pub parent_hash: ExecutionBlockHash,
    pub total_difficulty: Uint256,
    pub block_number: u64,
    pub timestamp: u64,
}

impl PowBlock {
    /// Genesis blocks point at the zero hash.
    pub fn is_genesis(&self) -> bool {
        self.parent_hash == ExecutionBlockHash::zero()
    }
}
