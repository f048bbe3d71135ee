use crate::engine_api::{Error as ApiError, PayloadStatusV1, PayloadStatusV1Status};
use slog::{warn, Logger};
use types::ExecutionBlockHash;

/// Provides a simpler, easier to parse version of `PayloadStatusV1` for upstream users.
///
/// `Syncing` and `Accepted` are both inconclusive and should be treated alike. `FailedExecution`
/// is never reported by an engine: it records that validation could not be completed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadStatus {
    Valid,
    Invalid {
        latest_valid_hash: Option<ExecutionBlockHash>,
        validation_error: Option<String>,
    },
    Syncing,
    Accepted,
    InvalidBlockHash {
        validation_error: Option<String>,
    },
    FailedExecution {
        error: String,
    },
}

impl PayloadStatus {
    /// An `Invalid` status with a reason and no known valid ancestor.
    pub fn invalid(validation_error: impl Into<String>) -> Self {
        PayloadStatus::Invalid {
            latest_valid_hash: None,
            validation_error: Some(validation_error.into()),
        }
    }

    pub fn failed_execution(error: impl std::fmt::Debug) -> Self {
        PayloadStatus::FailedExecution {
            error: format!("{:?}", error),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PayloadStatus::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            PayloadStatus::Invalid { .. } | PayloadStatus::InvalidBlockHash { .. }
        )
    }

    /// Returns `true` when the engine could not yet decide.
    pub fn is_optimistic(&self) -> bool {
        matches!(self, PayloadStatus::Syncing | PayloadStatus::Accepted)
    }

    pub fn has_failed_execution(&self) -> bool {
        matches!(self, PayloadStatus::FailedExecution { .. })
    }
}

/// Checks an engine's `PayloadStatusV1` response to a payload whose hash is `head_block_hash`.
///
/// ## Details
///
/// - A `VALID` response must carry `latest_valid_hash == head_block_hash`, otherwise it is a bad
///     response.
/// - An `INVALID` response must carry a `latest_valid_hash`, otherwise it is a bad response.
/// - All other statuses should have a null `latest_valid_hash`. In the interests of being liberal
///     with what we accept, a non-null value only raises a warning.
pub fn process_payload_status(
    head_block_hash: ExecutionBlockHash,
    response: PayloadStatusV1,
    log: &Logger,
) -> Result<PayloadStatus, ApiError> {
    match response.status {
        PayloadStatusV1Status::Valid => {
            if response
                .latest_valid_hash
                .map_or(false, |h| h == head_block_hash)
            {
                // The response is only valid if `latest_valid_hash` is not `null` and
                // equal to the provided `block_hash`.
                Ok(PayloadStatus::Valid)
            } else {
                Err(ApiError::BadResponse(format!(
                    "new_payload: response.status = VALID but invalid latest_valid_hash. Expected({:?}) Found({:?})",
                    head_block_hash, response.latest_valid_hash,
                )))
            }
        }
        PayloadStatusV1Status::Invalid => {
            if let Some(latest_valid_hash) = response.latest_valid_hash {
                // The response is only valid if `latest_valid_hash` is not `null`.
                Ok(PayloadStatus::Invalid {
                    latest_valid_hash: Some(latest_valid_hash),
                    validation_error: response.validation_error,
                })
            } else {
                Err(ApiError::BadResponse(
                    "new_payload: response.status = INVALID but null latest_valid_hash"
                        .to_string(),
                ))
            }
        }
        PayloadStatusV1Status::InvalidBlockHash => {
            warn_on_latest_valid_hash(&response, log);
            Ok(PayloadStatus::InvalidBlockHash {
                validation_error: response.validation_error,
            })
        }
        PayloadStatusV1Status::Syncing => {
            warn_on_latest_valid_hash(&response, log);
            Ok(PayloadStatus::Syncing)
        }
        PayloadStatusV1Status::Accepted => {
            warn_on_latest_valid_hash(&response, log);
            Ok(PayloadStatus::Accepted)
        }
    }
}

fn warn_on_latest_valid_hash(response: &PayloadStatusV1, log: &Logger) {
    if response.latest_valid_hash.is_some() {
        warn!(
            log,
            "Malformed response from execution engine";
            "msg" => "expected a null latest_valid_hash",
            "status" => ?response.status
        )
    }
}
