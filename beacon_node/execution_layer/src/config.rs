use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use types::Address;
use url::Url;

/// Configuration for the connection to an execution engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint url for the EL.
    pub execution_endpoint: Option<Url>,
    /// Path to a file holding the hex-encoded JWT secret shared with the EL.
    ///
    /// Requests are unauthenticated when this is `None`.
    pub secret_file: Option<PathBuf>,
    /// The `id` claim of each JWT.
    pub jwt_id: Option<String>,
    /// The `clv` claim of each JWT.
    pub jwt_version: Option<String>,
    /// Fee recipient used when asking the EL to build payloads.
    pub suggested_fee_recipient: Option<Address>,
}
