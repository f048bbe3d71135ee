//! Strategies for filling the body of a new block.

use crate::BlockProductionError;
use execution_layer::ExecutionLayer;
use futures::future::{self, BoxFuture, FutureExt};
use slog::{debug, warn, Logger};
use state_processing::per_block_processing::compute_timestamp_at_slot;
use std::sync::Arc;
use tokio::runtime::Handle;
use types::*;

/// Resolves to the body of the block being produced.
pub type BodySelector = BoxFuture<'static, Result<BeaconBlockBody, BlockProductionError>>;

/// Decides which operations go into a new block.
pub trait BlockOperationSelector: Send + Sync {
    /// Returns the body for a block at `state.slot` building on `parent_root`.
    ///
    /// `state` must already be advanced to the slot of the new block. `graffiti` overrides the
    /// selector's default graffiti.
    fn create_selector(
        &self,
        parent_root: Hash256,
        state: &BeaconState,
        randao_reveal: SignatureBytes,
        graffiti: Option<Graffiti>,
    ) -> BodySelector;

    /// Hints that a block will be produced at `slot`, so that slow work can start early.
    ///
    /// Never fails, problems are logged.
    fn prepare_execution_payload(&self, state: Option<&BeaconState>, slot: Slot);
}

/// Produces blocks with the default (empty) execution payload, as before the merge.
pub struct DefaultOperationSelector {
    default_graffiti: Graffiti,
}

impl DefaultOperationSelector {
    pub fn new(default_graffiti: Graffiti) -> Self {
        Self { default_graffiti }
    }
}

impl BlockOperationSelector for DefaultOperationSelector {
    fn create_selector(
        &self,
        _parent_root: Hash256,
        _state: &BeaconState,
        randao_reveal: SignatureBytes,
        graffiti: Option<Graffiti>,
    ) -> BodySelector {
        future::ready(Ok(BeaconBlockBody {
            randao_reveal,
            graffiti: graffiti.unwrap_or(self.default_graffiti),
            execution_payload: ExecutionPayload::default(),
        }))
        .boxed()
    }

    fn prepare_execution_payload(&self, _state: Option<&BeaconState>, _slot: Slot) {}
}

/// The values an execution payload for a given slot depends on.
#[derive(Debug, Clone, Copy)]
struct PayloadParameters {
    /// `None` until the merge is complete, the terminal PoW block is the parent then.
    parent_hash: Option<ExecutionBlockHash>,
    timestamp: u64,
    prev_randao: Hash256,
}

impl PayloadParameters {
    fn from_state(
        state: &BeaconState,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<Self, BlockProductionError> {
        let parent_hash = state
            .is_merge_transition_complete()
            .then_some(state.latest_execution_payload_header.block_hash);

        Ok(Self {
            parent_hash,
            timestamp: compute_timestamp_at_slot(state, slot, spec)?,
            prev_randao: *state.get_randao_mix(state.current_epoch(spec))?,
        })
    }

    /// Resolves the parent hash, returning `None` if there is no terminal PoW block yet.
    async fn parent_hash(
        &self,
        execution_layer: &ExecutionLayer,
        spec: &ChainSpec,
    ) -> Result<Option<ExecutionBlockHash>, BlockProductionError> {
        match self.parent_hash {
            Some(parent_hash) => Ok(Some(parent_hash)),
            None => Ok(execution_layer.get_terminal_pow_block_hash(spec).await?),
        }
    }
}

/// Fills blocks with payloads built by the execution engine.
///
/// Before the merge the payload builds on the terminal PoW block, or is left empty while there is
/// none. Payload ids obtained by `prepare_execution_payload` are reused when the block is produced.
pub struct ExecutionOperationSelector {
    execution_layer: ExecutionLayer,
    spec: Arc<ChainSpec>,
    default_graffiti: Graffiti,
    executor: Handle,
    log: Logger,
}

impl ExecutionOperationSelector {
    pub fn new(
        execution_layer: ExecutionLayer,
        spec: Arc<ChainSpec>,
        default_graffiti: Graffiti,
        executor: Handle,
        log: Logger,
    ) -> Self {
        Self {
            execution_layer,
            spec,
            default_graffiti,
            executor,
            log,
        }
    }
}

impl BlockOperationSelector for ExecutionOperationSelector {
    fn create_selector(
        &self,
        _parent_root: Hash256,
        state: &BeaconState,
        randao_reveal: SignatureBytes,
        graffiti: Option<Graffiti>,
    ) -> BodySelector {
        let graffiti = graffiti.unwrap_or(self.default_graffiti);
        let parameters = match PayloadParameters::from_state(state, state.slot, &self.spec) {
            Ok(parameters) => parameters,
            Err(e) => return future::ready(Err(e)).boxed(),
        };
        let execution_layer = self.execution_layer.clone();
        let spec = self.spec.clone();

        async move {
            let execution_payload = match parameters.parent_hash(&execution_layer, &spec).await? {
                Some(parent_hash) => {
                    execution_layer
                        .get_payload(
                            parent_hash,
                            parameters.timestamp,
                            parameters.prev_randao,
                            ExecutionBlockHash::zero(),
                        )
                        .await?
                }
                None => {
                    debug!(
                        execution_layer.log(),
                        "No terminal PoW block, producing empty payload";
                        "terminal_total_difficulty" => ?spec.terminal_total_difficulty,
                    );
                    ExecutionPayload::default()
                }
            };

            Ok(BeaconBlockBody {
                randao_reveal,
                graffiti,
                execution_payload,
            })
        }
        .boxed()
    }

    fn prepare_execution_payload(&self, state: Option<&BeaconState>, slot: Slot) {
        let Some(state) = state else {
            return;
        };

        let parameters = match PayloadParameters::from_state(state, slot, &self.spec) {
            Ok(parameters) => parameters,
            Err(e) => {
                warn!(
                    self.log,
                    "Unable to prepare execution payload";
                    "error" => ?e,
                    "slot" => %slot,
                );
                return;
            }
        };
        let execution_layer = self.execution_layer.clone();
        let spec = self.spec.clone();
        let log = self.log.clone();

        self.executor.spawn(async move {
            let result = match parameters.parent_hash(&execution_layer, &spec).await {
                Ok(Some(parent_hash)) => execution_layer
                    .prepare_payload(
                        parent_hash,
                        parameters.timestamp,
                        parameters.prev_randao,
                        ExecutionBlockHash::zero(),
                    )
                    .await
                    .map(|_| ())
                    .map_err(BlockProductionError::from),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                warn!(
                    log,
                    "Failed to prepare execution payload";
                    "error" => ?e,
                    "slot" => %slot,
                );
            }
        });
    }
}
