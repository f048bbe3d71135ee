use crate::{Address, ExecutionBlockHash, Hash256, Uint256};
use serde::{Deserialize, Serialize};
use ssz_types::typenum::{U1048576, U1073741824, U256, U32};
use ssz_types::{FixedVector, VariableList};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

pub type MaxBytesPerTransaction = U1073741824;
pub type MaxTransactionsPerPayload = U1048576;
pub type BytesPerLogsBloom = U256;
pub type MaxExtraDataBytes = U32;

pub type Transaction = VariableList<u8, MaxBytesPerTransaction>;
pub type Transactions = VariableList<Transaction, MaxTransactionsPerPayload>;

/// An execution-layer block as carried in a beacon block body.
///
/// The `Default` value is the "empty" payload included in blocks produced before the merge. It is
/// always considered valid and is never sent to the execution engine.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, TreeHash)]
pub struct ExecutionPayload {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: Address,
    pub state_root: Hash256,
    pub receipts_root: Hash256,
    #[serde(with = "ssz_types::serde_utils::hex_fixed_vec")]
    pub logs_bloom: FixedVector<u8, BytesPerLogsBloom>,
    pub prev_randao: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    #[serde(with = "ssz_types::serde_utils::hex_var_list")]
    pub extra_data: VariableList<u8, MaxExtraDataBytes>,
    #[serde(with = "serde_utils::quoted_u256")]
    pub base_fee_per_gas: Uint256,
    pub block_hash: ExecutionBlockHash,
    #[serde(with = "ssz_types::serde_utils::list_of_hex_var_list")]
    pub transactions: Transactions,
}

impl ExecutionPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if this is the empty, pre-merge payload.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// The hash tree root of the transaction list, as committed to by the payload header.
    pub fn transactions_root(&self) -> Hash256 {
        self.transactions.tree_hash_root()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, TreeHash)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: Address,
    pub state_root: Hash256,
    pub receipts_root: Hash256,
    #[serde(with = "ssz_types::serde_utils::hex_fixed_vec")]
    pub logs_bloom: FixedVector<u8, BytesPerLogsBloom>,
    pub prev_randao: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    #[serde(with = "ssz_types::serde_utils::hex_var_list")]
    pub extra_data: VariableList<u8, MaxExtraDataBytes>,
    #[serde(with = "serde_utils::quoted_u256")]
    pub base_fee_per_gas: Uint256,
    pub block_hash: ExecutionBlockHash,
    pub transactions_root: Hash256,
}

impl ExecutionPayloadHeader {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default header is held by every state that has not yet seen a non-empty payload.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl<'a> From<&'a ExecutionPayload> for ExecutionPayloadHeader {
    fn from(payload: &'a ExecutionPayload) -> Self {
        // The empty payload maps to the empty header, so "merge complete" stays false until a
        // real payload is applied.
        if payload.is_default() {
            return Self::default();
        }

        ExecutionPayloadHeader {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom.clone(),
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data.clone(),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions_root: payload.transactions_root(),
        }
    }
}
