use types::BeaconStateError;

#[derive(Debug, PartialEq)]
pub enum EpochProcessingError {
    BeaconStateError(BeaconStateError),
    ArithError(safe_arith::ArithError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> EpochProcessingError {
        EpochProcessingError::BeaconStateError(e)
    }
}

impl From<safe_arith::ArithError> for EpochProcessingError {
    fn from(e: safe_arith::ArithError) -> EpochProcessingError {
        EpochProcessingError::ArithError(e)
    }
}
