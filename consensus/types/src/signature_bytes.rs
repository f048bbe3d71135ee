use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tree_hash::{PackedEncoding, TreeHash};

pub const SIGNATURE_BYTES_LEN: usize = 96;

/// An unchecked, serialized BLS signature.
///
/// Only used here to carry the proposer's RANDAO reveal, so no point decompression is attempted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureBytes([u8; SIGNATURE_BYTES_LEN]);

impl SignatureBytes {
    pub fn empty() -> Self {
        Self([0; SIGNATURE_BYTES_LEN])
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(format!(
                "incorrect signature length {}, expected {}",
                bytes.len(),
                SIGNATURE_BYTES_LEN
            ));
        }
        let mut array = [0; SIGNATURE_BYTES_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<[u8; SIGNATURE_BYTES_LEN]> for SignatureBytes {
    fn from(bytes: [u8; SIGNATURE_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

/// Hashed as a `Vector[byte, 96]`, the same as a compressed BLS signature.
impl TreeHash for SignatureBytes {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> PackedEncoding {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        let minimum_chunk_count = SIGNATURE_BYTES_LEN.div_ceil(tree_hash::BYTES_PER_CHUNK);
        tree_hash::merkle_root(&self.0, minimum_chunk_count)
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_utils::hex::encode(self.0))
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&serde_utils::hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let bytes = serde_utils::hex::decode(&s).map_err(D::Error::custom)?;
        SignatureBytes::from_slice(&bytes).map_err(D::Error::custom)
    }
}
