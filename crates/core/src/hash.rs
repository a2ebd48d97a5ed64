//! SHA-256 hashing utilities for the ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// A wrapper type for H256 with Display and Debug formatting.
///
/// Serializes as a lowercase hex string in human-readable formats (JSON
/// snapshots) and as raw bytes otherwise (header preimages).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros). Used as the genesis sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new Hash from raw bytes.
    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse the canonical spelling produced by [`Hash::to_hex`]: exactly 64
    /// lowercase hex digits, no prefix.
    pub fn from_canonical_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = decode_canonical_hex(s)?;
        let arr: H256 = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Number of leading zero hex digits (nibbles) in this hash.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }

    /// Check whether this hash satisfies a proof-of-work target of
    /// `difficulty` leading hex zeros.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_nibbles() >= difficulty
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Hash::from_canonical_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Hash(<H256>::deserialize(deserializer)?))
        }
    }
}

/// Hash arbitrary data using SHA-256.
pub fn hash(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Hash multiple pieces of data by concatenating them.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

/// Hash the canonical JSON encoding of a value.
///
/// Field order follows struct declaration order and `serde_json::Value`
/// objects are key-sorted, so the encoding is stable across save/load.
pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> Hash {
    let encoded = serde_json::to_vec(value).expect("serialization should not fail");
    hash(&encoded)
}

/// Decode lowercase hex, rejecting any other spelling of the same bytes.
///
/// Persisted hex fields must have exactly one encoding, otherwise an edit
/// such as changing the case of a digit would leave the decoded bytes and
/// every hash over them unchanged.
pub fn decode_canonical_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    if let Some((index, c)) = s.char_indices().find(|(_, c)| c.is_ascii_uppercase()) {
        return Err(hex::FromHexError::InvalidHexCharacter { c, index });
    }
    hex::decode(s)
}
