use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
pub use types::{
    Address, ExecutionBlockHash, ExecutionPayload, ExecutionPayloadHeader, Hash256, PowBlock,
    Uint256,
};

pub mod auth;
pub mod http;
pub mod json_structures;

pub const LATEST_TAG: &str = "latest";

pub type PayloadId = [u8; 8];

#[derive(Debug)]
pub enum Error {
    Reqwest(reqwest::Error),
    Auth(auth::Error),
    BadResponse(String),
    RequestFailed(String),
    Json(serde_json::Error),
    ServerMessage { code: i64, message: String },
    ExecutionBlockNotFound(ExecutionBlockHash),
    ExecutionHeadBlockNotFound,
    ParentHashEqualsBlockHash(ExecutionBlockHash),
    PayloadIdUnavailable,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if matches!(
            e.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        ) {
            Error::Auth(auth::Error::InvalidToken)
        } else {
            Error::Reqwest(e)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<auth::Error> for Error {
    fn from(e: auth::Error) -> Self {
        Error::Auth(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadStatusV1Status {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
}

/// A payload status exactly as an engine reported it, before any sanity checks.
///
/// See `payload_status::process_payload_status` for the checked form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadStatusV1 {
    pub status: PayloadStatusV1Status,
    pub latest_valid_hash: Option<ExecutionBlockHash>,
    pub validation_error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockByNumberQuery<'a> {
    Tag(&'a str),
}

/// Representation of an exection block with enough detail to determine the terminal PoW block.
///
/// See `merge_transition::get_terminal_pow_block_hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBlock {
    #[serde(rename = "hash")]
    pub block_hash: ExecutionBlockHash,
    #[serde(rename = "number", with = "serde_utils::u64_hex_be")]
    pub block_number: u64,
    pub parent_hash: ExecutionBlockHash,
    pub total_difficulty: Uint256,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub timestamp: u64,
}

impl From<ExecutionBlock> for PowBlock {
    fn from(block: ExecutionBlock) -> PowBlock {
        PowBlock {
            block_hash: block.block_hash,
            parent_hash: block.parent_hash,
            total_difficulty: block.total_difficulty,
            block_number: block.block_number,
            timestamp: block.timestamp,
        }
    }
}

impl From<PowBlock> for ExecutionBlock {
    fn from(block: PowBlock) -> ExecutionBlock {
        ExecutionBlock {
            block_hash: block.block_hash,
            block_number: block.block_number,
            parent_hash: block.parent_hash,
            total_difficulty: block.total_difficulty,
            timestamp: block.timestamp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PayloadAttributes {
    pub timestamp: u64,
    pub prev_randao: Hash256,
    pub suggested_fee_recipient: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ForkchoiceState {
    pub head_block_hash: ExecutionBlockHash,
    pub safe_block_hash: ExecutionBlockHash,
    pub finalized_block_hash: ExecutionBlockHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkchoiceUpdatedResponse {
    pub payload_status: PayloadStatusV1,
    pub payload_id: Option<PayloadId>,
}
