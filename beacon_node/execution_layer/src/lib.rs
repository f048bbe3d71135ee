//! This crate provides an abstraction over an *execution engine*, like Geth, Nethermind, Erigon,
//! etc.
//!
//! It is only concerned with the functionality needed for "The Merge": submitting payloads for
//! validation, checking the legality of the merge transition block and producing payloads.

use async_trait::async_trait;
use engine_api::auth::{Auth, CachedTokenProvider, NoAuth, TokenProvider};
use engine_api::{
    Error as ApiError, ForkchoiceState, ForkchoiceUpdatedResponse, PayloadAttributes, PayloadId,
};
use lru::LruCache;
use merge_transition::MergeTransitionValidator;
use parking_lot::Mutex;
use slog::{debug, Logger};
use std::num::NonZeroUsize;
use std::sync::Arc;
use types::{Address, ChainSpec, ExecutionBlockHash, ExecutionPayload, Hash256, PowBlock};

pub use config::Config;
pub use engine_api::http::HttpJsonRpc;
pub use engines::Engine;
pub use merge_transition::{MergeBlockValidator, TerminalDifficulty};
pub use payload_status::PayloadStatus;

mod config;
pub mod engine_api;
mod engines;
pub mod merge_transition;
pub mod payload_status;
pub mod test_utils;

/// The number of payload IDs that will be remembered.
///
/// Since the size of each value is small (~100 bytes) a large number is used for safety.
const PAYLOAD_ID_LRU_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

#[derive(Debug)]
pub enum Error {
    NoEngine,
    ApiError(ApiError),
    FeeRecipientUnspecified,
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Error::ApiError(e)
    }
}

impl From<engine_api::auth::Error> for Error {
    fn from(e: engine_api::auth::Error) -> Self {
        Error::ApiError(ApiError::Auth(e))
    }
}

/// The channel through which the consensus layer talks to an execution engine.
///
/// `Engine` implements this over JSON-RPC, `test_utils::MockExecutionEngine` implements it in
/// memory.
#[async_trait]
pub trait ExecutionEngineChannel: Send + Sync {
    /// Submits a payload for validation (`engine_newPayload`).
    async fn new_payload(&self, execution_payload: ExecutionPayload)
        -> Result<PayloadStatus, ApiError>;

    /// Returns `Ok(None)` when the engine does not know the block.
    async fn get_pow_block(
        &self,
        block_hash: ExecutionBlockHash,
    ) -> Result<Option<PowBlock>, ApiError>;

    async fn get_pow_chain_head(&self) -> Result<PowBlock, ApiError>;

    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResponse, ApiError>;

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, ApiError>;
}

#[derive(Hash, PartialEq, Eq)]
struct PayloadIdCacheKey {
    pub head_block_hash: ExecutionBlockHash,
    pub timestamp: u64,
    pub prev_randao: Hash256,
    pub suggested_fee_recipient: Address,
}

impl PayloadIdCacheKey {
    fn new(state: &ForkchoiceState, attr: &PayloadAttributes) -> Self {
        Self {
            head_block_hash: state.head_block_hash,
            timestamp: attr.timestamp,
            prev_randao: attr.prev_randao,
            suggested_fee_recipient: attr.suggested_fee_recipient,
        }
    }
}

struct Inner {
    engine: Arc<dyn ExecutionEngineChannel>,
    suggested_fee_recipient: Option<Address>,
    payload_id_cache: Mutex<LruCache<PayloadIdCacheKey, PayloadId>>,
    log: Logger,
}

/// Provides access to an execution engine with a neat interface for block production and
/// verification.
#[derive(Clone)]
pub struct ExecutionLayer {
    inner: Arc<Inner>,
}

impl ExecutionLayer {
    pub fn new(
        engine: Arc<dyn ExecutionEngineChannel>,
        suggested_fee_recipient: Option<Address>,
        log: Logger,
    ) -> Self {
        let inner = Inner {
            engine,
            suggested_fee_recipient,
            payload_id_cache: Mutex::new(LruCache::new(PAYLOAD_ID_LRU_CACHE_SIZE)),
            log,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Instantiate `Self` with an engine using the JSON-RPC via HTTP.
    ///
    /// Requests are authenticated with a JWT when `config.secret_file` is set.
    pub fn from_config(config: Config, log: Logger) -> Result<Self, Error> {
        let Config {
            execution_endpoint,
            secret_file,
            jwt_id,
            jwt_version,
            suggested_fee_recipient,
        } = config;

        let url = execution_endpoint.ok_or(Error::NoEngine)?;
        let authenticated = secret_file.is_some();

        let token_provider: Arc<dyn TokenProvider> = match secret_file {
            Some(path) => Arc::new(CachedTokenProvider::new(Auth::new_with_path(
                &path,
                jwt_id,
                jwt_version,
            )?)),
            None => Arc::new(NoAuth),
        };

        debug!(
            log,
            "Loaded execution endpoint";
            "endpoint" => %url,
            "authenticated" => authenticated,
        );

        let api = HttpJsonRpc::new_with_auth(url, token_provider)?;
        let engine = Engine::new(api, log.clone());

        Ok(Self::new(Arc::new(engine), suggested_fee_recipient, log))
    }

    pub fn engine(&self) -> &Arc<dyn ExecutionEngineChannel> {
        &self.inner.engine
    }

    pub fn log(&self) -> &Logger {
        &self.inner.log
    }

    pub fn suggested_fee_recipient(&self) -> Result<Address, Error> {
        self.inner
            .suggested_fee_recipient
            .ok_or(Error::FeeRecipientUnspecified)
    }

    /// Returns a validator for merge transition blocks backed by this engine.
    pub fn merge_transition_validator(&self, spec: &ChainSpec) -> MergeTransitionValidator {
        MergeTransitionValidator::new(
            self.engine().clone(),
            TerminalDifficulty::from_spec(spec),
            self.log().clone(),
        )
    }

    fn get_payload_id(
        &self,
        head_block_hash: ExecutionBlockHash,
        timestamp: u64,
        prev_randao: Hash256,
        suggested_fee_recipient: Address,
    ) -> Option<PayloadId> {
        self.inner
            .payload_id_cache
            .lock()
            .get(&PayloadIdCacheKey {
                head_block_hash,
                timestamp,
                prev_randao,
                suggested_fee_recipient,
            })
            .cloned()
    }

    /// Maps to the `engine_forkchoiceUpdated` JSON-RPC call.
    ///
    /// Any payload id returned for `payload_attributes` is remembered so that a later
    /// `get_payload` with the same attributes can skip the round-trip.
    pub async fn notify_forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResponse, Error> {
        debug!(
            self.log(),
            "Issuing engine_forkchoiceUpdated";
            "finalized_block_hash" => ?forkchoice_state.finalized_block_hash,
            "head_block_hash" => ?forkchoice_state.head_block_hash,
        );

        let response = self
            .engine()
            .forkchoice_updated(forkchoice_state, payload_attributes)
            .await?;

        if let Some(payload_id) = response.payload_id {
            if let Some(key) =
                payload_attributes.map(|pa| PayloadIdCacheKey::new(&forkchoice_state, &pa))
            {
                self.inner.payload_id_cache.lock().put(key, payload_id);
            } else {
                debug!(
                    self.log(),
                    "Engine returned unexpected payload_id";
                    "payload_id" => ?payload_id
                );
            }
        }

        Ok(response)
    }

    /// Returns a payload id for a payload built on `parent_hash`, asking the engine to start
    /// building one when no id is cached for these parameters.
    pub async fn prepare_payload(
        &self,
        parent_hash: ExecutionBlockHash,
        timestamp: u64,
        prev_randao: Hash256,
        finalized_block_hash: ExecutionBlockHash,
    ) -> Result<PayloadId, Error> {
        let suggested_fee_recipient = self.suggested_fee_recipient()?;

        if let Some(id) =
            self.get_payload_id(parent_hash, timestamp, prev_randao, suggested_fee_recipient)
        {
            return Ok(id);
        }

        let forkchoice_state = ForkchoiceState {
            head_block_hash: parent_hash,
            safe_block_hash: parent_hash,
            finalized_block_hash,
        };
        let payload_attributes = PayloadAttributes {
            timestamp,
            prev_randao,
            suggested_fee_recipient,
        };

        self.notify_forkchoice_updated(forkchoice_state, Some(payload_attributes))
            .await?
            .payload_id
            .ok_or(Error::ApiError(ApiError::PayloadIdUnavailable))
    }

    /// Maps to the `engine_getPayload` JSON-RPC call.
    ///
    /// However, it will attempt to call `self.prepare_payload` if it cannot find an existing
    /// payload id for the given parameters.
    pub async fn get_payload(
        &self,
        parent_hash: ExecutionBlockHash,
        timestamp: u64,
        prev_randao: Hash256,
        finalized_block_hash: ExecutionBlockHash,
    ) -> Result<ExecutionPayload, Error> {
        debug!(
            self.log(),
            "Issuing engine_getPayload";
            "suggested_fee_recipient" => ?self.inner.suggested_fee_recipient,
            "prev_randao" => ?prev_randao,
            "timestamp" => timestamp,
            "parent_hash" => ?parent_hash,
        );

        let payload_id = self
            .prepare_payload(parent_hash, timestamp, prev_randao, finalized_block_hash)
            .await?;

        self.engine()
            .get_payload(payload_id)
            .await
            .map_err(Into::into)
    }

    /// Used during block production to determine if the merge has been triggered.
    pub async fn get_terminal_pow_block_hash(
        &self,
        spec: &ChainSpec,
    ) -> Result<Option<ExecutionBlockHash>, Error> {
        merge_transition::get_terminal_pow_block_hash(self.engine().as_ref(), spec, self.log())
            .await
            .map_err(Into::into)
    }
}
