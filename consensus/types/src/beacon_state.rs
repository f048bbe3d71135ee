use crate::*;
use ethereum_hashing::hash_fixed;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    EpochOutOfBounds,
    SlotOutOfBounds,
    BlockRootsOutOfBounds(usize),
    RandaoMixesOutOfBounds(usize),
    InsufficientValidators,
    ZeroSlotsPerEpoch,
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}

/// The part of the beacon state that slot advance and block production operate on.
///
/// `block_roots` and `randao_mixes` are ring buffers sized by the `ChainSpec` the state was
/// created with.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BeaconState {
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub slot: Slot,
    pub latest_block_root: Hash256,
    pub block_roots: Vec<Hash256>,
    pub randao_mixes: Vec<Hash256>,
    #[serde(with = "serde_utils::quoted_u64")]
    pub active_validator_count: u64,
    pub latest_execution_payload_header: ExecutionPayloadHeader,
}

impl BeaconState {
    /// Create a genesis state, every RANDAO mix seeded with `genesis_mix`.
    pub fn new(
        genesis_time: u64,
        active_validator_count: u64,
        genesis_mix: Hash256,
        spec: &ChainSpec,
    ) -> Self {
        BeaconState {
            genesis_time,
            slot: Slot::new(0),
            latest_block_root: BeaconBlock::empty().canonical_root(),
            block_roots: vec![Hash256::zero(); spec.slots_per_historical_root as usize],
            randao_mixes: vec![genesis_mix; spec.epochs_per_historical_vector as usize],
            active_validator_count,
            latest_execution_payload_header: ExecutionPayloadHeader::default(),
        }
    }

    pub fn current_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.slot.epoch(spec.slots_per_epoch)
    }

    /// The merge is complete once a non-empty execution payload has been applied.
    pub fn is_merge_transition_complete(&self) -> bool {
        !self.latest_execution_payload_header.is_default()
    }

    /// Safely obtains the index for `block_roots`, given some `slot`.
    fn get_latest_block_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        let len = self.block_roots.len();
        if slot < self.slot && self.slot <= slot.safe_add(len as u64)? {
            Ok(slot.as_usize().safe_rem(len)?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Return the block root at a recent `slot`.
    pub fn get_block_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.block_roots
            .get(i)
            .ok_or(Error::BlockRootsOutOfBounds(i))
    }

    /// Sets the block root for some given slot.
    pub fn set_block_root(&mut self, slot: Slot, block_root: Hash256) -> Result<(), Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        *self
            .block_roots
            .get_mut(i)
            .ok_or(Error::BlockRootsOutOfBounds(i))? = block_root;
        Ok(())
    }

    fn get_randao_mix_index(&self, epoch: Epoch) -> Result<usize, Error> {
        let len = self.randao_mixes.len();
        if len == 0 {
            return Err(Error::RandaoMixesOutOfBounds(0));
        }
        Ok(epoch.as_usize().safe_rem(len)?)
    }

    /// Return the randao mix at a recent ``epoch``.
    pub fn get_randao_mix(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        let i = self.get_randao_mix_index(epoch)?;
        self.randao_mixes
            .get(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))
    }

    pub fn set_randao_mix(&mut self, epoch: Epoch, mix: Hash256) -> Result<(), Error> {
        let i = self.get_randao_mix_index(epoch)?;
        *self
            .randao_mixes
            .get_mut(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))? = mix;
        Ok(())
    }

    /// XOR-assigns the existing `epoch` randao mix with the hash of the `signature`.
    pub fn update_randao_mix(
        &mut self,
        epoch: Epoch,
        signature: &SignatureBytes,
    ) -> Result<(), Error> {
        let signature_hash = Hash256::from(hash_fixed(signature.as_slice()));
        let mix = *self.get_randao_mix(epoch)? ^ signature_hash;
        self.set_randao_mix(epoch, mix)
    }

    /// Returns the beacon proposer index for `slot`, which must be in the current epoch.
    ///
    /// The seed mixes the current epoch's RANDAO mix with the slot, so the choice is
    /// deterministic for a given state and unpredictable before the mix is known.
    pub fn get_beacon_proposer_index(&self, slot: Slot, spec: &ChainSpec) -> Result<u64, Error> {
        if spec.slots_per_epoch == 0 {
            return Err(Error::ZeroSlotsPerEpoch);
        }

        let epoch = slot.epoch(spec.slots_per_epoch);
        if epoch != self.current_epoch(spec) {
            return Err(Error::SlotOutOfBounds);
        }

        if self.active_validator_count == 0 {
            return Err(Error::InsufficientValidators);
        }

        let mut preimage = self.get_randao_mix(epoch)?.as_bytes().to_vec();
        preimage.extend_from_slice(&slot.as_u64().to_le_bytes());
        let seed = hash_fixed(&preimage);

        let mut first_bytes = [0; 8];
        first_bytes.copy_from_slice(&seed[..8]);

        Ok(u64::from_le_bytes(first_bytes).safe_rem(self.active_validator_count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> (BeaconState, ChainSpec) {
        let spec = ChainSpec::minimal();
        let state = BeaconState::new(0, 64, Hash256::repeat_byte(42), &spec);
        (state, spec)
    }

    #[test]
    fn block_roots_window() {
        let (mut state, spec) = state();
        state.slot = Slot::new(10);

        assert_eq!(state.set_block_root(Slot::new(9), Hash256::repeat_byte(9)), Ok(()));
        assert_eq!(state.get_block_root(Slot::new(9)), Ok(&Hash256::repeat_byte(9)));

        // The current slot and future slots have no recorded root yet.
        assert_eq!(state.get_block_root(Slot::new(10)), Err(Error::SlotOutOfBounds));

        // Slots older than the history length have been overwritten.
        state.slot = Slot::new(10 + spec.slots_per_historical_root);
        assert_eq!(state.get_block_root(Slot::new(9)), Err(Error::SlotOutOfBounds));
    }

    #[test]
    fn update_randao_mix_xors_hash_of_reveal() {
        let (mut state, _) = state();
        let reveal = SignatureBytes::from([7; 96]);
        let before = *state.get_randao_mix(Epoch::new(0)).unwrap();

        state.update_randao_mix(Epoch::new(0), &reveal).unwrap();
        let after = *state.get_randao_mix(Epoch::new(0)).unwrap();
        assert_ne!(before, after);

        // XOR twice restores the original mix.
        state.update_randao_mix(Epoch::new(0), &reveal).unwrap();
        assert_eq!(*state.get_randao_mix(Epoch::new(0)).unwrap(), before);
    }

    #[test]
    fn proposer_index() {
        let (mut state, spec) = state();
        let index = state
            .get_beacon_proposer_index(Slot::new(0), &spec)
            .unwrap();
        assert!(index < state.active_validator_count);
        assert_eq!(
            state.get_beacon_proposer_index(Slot::new(0), &spec),
            Ok(index)
        );

        assert_eq!(
            state.get_beacon_proposer_index(Slot::new(spec.slots_per_epoch), &spec),
            Err(Error::SlotOutOfBounds)
        );

        state.active_validator_count = 0;
        assert_eq!(
            state.get_beacon_proposer_index(Slot::new(0), &spec),
            Err(Error::InsufficientValidators)
        );
    }

    #[test]
    fn merge_transition_complete() {
        let (mut state, _) = state();
        assert!(!state.is_merge_transition_complete());

        state.latest_execution_payload_header.block_hash = ExecutionBlockHash::repeat_byte(1);
        assert!(state.is_merge_transition_complete());
    }
}
