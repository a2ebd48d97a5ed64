//! Signed, hash-linked ledger entries.

use crate::crypto::{KeyManager, PublicKey, Signature};
use crate::hash::{hash_json, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors found when checking a single entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry {id}: stored hash does not match its contents")]
    HashMismatch { id: String },
    #[error("entry {id}: signature does not verify against its public key")]
    InvalidSignature { id: String },
}

/// The payload recorded by an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EntryData {
    /// A token record was created or overwritten.
    #[serde(rename_all = "camelCase")]
    Mint {
        token_id: String,
        owner: String,
        amount: u64,
    },
    /// Part of a token balance moved to another owner.
    #[serde(rename_all = "camelCase")]
    Transfer {
        token_id: String,
        from: String,
        to: String,
        amount: u64,
        recipient_token_id: String,
    },
    /// A business event such as `compliance` or `onboarding`.
    #[serde(rename = "generic-log")]
    Log {
        category: String,
        payload: serde_json::Value,
    },
    /// Raw bytes the ledger does not interpret.
    Opaque {
        #[serde(with = "hex_bytes")]
        bytes: Vec<u8>,
    },
}

impl EntryData {
    /// Build a `generic-log` payload.
    pub fn log(category: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Log {
            category: category.into(),
            payload,
        }
    }

    /// Short kind name as it appears in the `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Transfer { .. } => "transfer",
            Self::Log { .. } => "generic-log",
            Self::Opaque { .. } => "opaque",
        }
    }

    /// Whether replaying this payload changes the token index.
    pub fn is_token_mutation(&self) -> bool {
        matches!(self, Self::Mint { .. } | Self::Transfer { .. })
    }
}

impl From<serde_json::Value> for EntryData {
    fn from(payload: serde_json::Value) -> Self {
        Self::log("generic", payload)
    }
}

impl From<Vec<u8>> for EntryData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Opaque { bytes }
    }
}

mod hex_bytes {
    use crate::hash::decode_canonical_hex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode_canonical_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A single signed unit of recorded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Caller-supplied identifier.
    pub id: String,
    /// Creation time in Unix milliseconds.
    pub timestamp: u64,
    /// Recorded payload.
    pub data: EntryData,
    /// Hash of the entry created immediately before this one.
    pub previous_hash: Hash,
    /// Hash of (id, timestamp, data, previous_hash).
    pub hash: Hash,
    /// Signature over `hash`.
    pub signature: Signature,
    /// Key that produced `signature`.
    pub public_key: PublicKey,
    /// Global entry sequence number.
    pub nonce: u64,
    /// Chain difficulty in force when the entry was created.
    pub difficulty: u32,
}

/// The hashed portion of an entry.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryPreimage<'a> {
    id: &'a str,
    timestamp: u64,
    data: &'a EntryData,
    previous_hash: &'a Hash,
}

/// Inputs the entry builder captures from the ledger state.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext {
    /// Hash of the current entry-chain tail.
    pub previous_hash: Hash,
    /// Sequence number to assign.
    pub sequence: u64,
    /// Current chain difficulty.
    pub difficulty: u32,
}

impl LedgerEntry {
    /// Create and sign an entry stamped with the current wall-clock time.
    pub fn create(
        id: impl Into<String>,
        data: EntryData,
        context: EntryContext,
        keys: &KeyManager,
    ) -> Self {
        Self::create_at(id, data, now_millis(), context, keys)
    }

    /// Create and sign an entry with an explicit timestamp.
    pub fn create_at(
        id: impl Into<String>,
        data: EntryData,
        timestamp: u64,
        context: EntryContext,
        keys: &KeyManager,
    ) -> Self {
        let id = id.into();
        let hash = compute_entry_hash(&id, timestamp, &data, &context.previous_hash);
        let signature = keys.sign(&hash);

        Self {
            id,
            timestamp,
            data,
            previous_hash: context.previous_hash,
            hash,
            signature,
            public_key: keys.public_key().clone(),
            nonce: context.sequence,
            difficulty: context.difficulty,
        }
    }

    /// Recompute the content hash from the entry's fields.
    pub fn compute_hash(&self) -> Hash {
        compute_entry_hash(&self.id, self.timestamp, &self.data, &self.previous_hash)
    }

    /// Leaf hash used by the Merkle aggregator: SHA-256 of the whole entry.
    pub fn leaf_hash(&self) -> Hash {
        hash_json(self)
    }

    /// Check the content hash and the signature.
    pub fn verify(&self) -> Result<(), EntryError> {
        if self.compute_hash() != self.hash {
            return Err(EntryError::HashMismatch {
                id: self.id.clone(),
            });
        }
        if !KeyManager::verify(&self.hash, &self.signature, &self.public_key) {
            return Err(EntryError::InvalidSignature {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

fn compute_entry_hash(id: &str, timestamp: u64, data: &EntryData, previous_hash: &Hash) -> Hash {
    hash_json(&EntryPreimage {
        id,
        timestamp,
        data,
        previous_hash,
    })
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> EntryContext {
        EntryContext {
            previous_hash: Hash::ZERO,
            sequence: 0,
            difficulty: 2,
        }
    }

    #[test]
    fn test_created_entry_verifies() {
        let keys = KeyManager::generate().unwrap();
        let data = EntryData::log("compliance", json!({"ok": true}));
        let entry = LedgerEntry::create("e-1", data, context(), &keys);

        assert!(entry.verify().is_ok());
        assert!(KeyManager::verify(&entry.hash, &entry.signature, &entry.public_key));
        assert_eq!(entry.previous_hash, Hash::ZERO);
        assert_eq!(entry.difficulty, 2);
    }

    #[test]
    fn test_tampered_data_detected() {
        let keys = KeyManager::generate().unwrap();
        let data = EntryData::log("audit", json!("a"));
        let mut entry = LedgerEntry::create("e-1", data, context(), &keys);
        entry.data = EntryData::log("audit", json!("b"));

        assert_eq!(
            entry.verify(),
            Err(EntryError::HashMismatch { id: "e-1".into() })
        );
    }

    #[test]
    fn test_foreign_signature_detected() {
        let keys = KeyManager::generate().unwrap();
        let other = KeyManager::generate().unwrap();
        let mut entry = LedgerEntry::create("e-1", vec![1, 2, 3].into(), context(), &keys);
        entry.public_key = other.public_key().clone();

        assert_eq!(
            entry.verify(),
            Err(EntryError::InvalidSignature { id: "e-1".into() })
        );
    }

    #[test]
    fn test_hash_depends_on_previous_hash() {
        let keys = KeyManager::from_secret(&[1u8; 32]);
        let data = EntryData::log("generic", json!({"n": 1}));
        let a = LedgerEntry::create_at("x", data.clone(), 1_000, context(), &keys);
        let linked = EntryContext {
            previous_hash: a.hash,
            ..context()
        };
        let b = LedgerEntry::create_at("x", data, 1_000, linked, &keys);

        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_json_shape() {
        let keys = KeyManager::generate().unwrap();
        let entry = LedgerEntry::create(
            "mint-1",
            EntryData::Mint {
                token_id: "client-42".into(),
                owner: "alice".into(),
                amount: 1000,
            },
            context(),
            &keys,
        );
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["data"]["type"], "mint");
        assert_eq!(value["data"]["tokenId"], "client-42");
        assert!(value["previousHash"].is_string());
        assert!(value["publicKey"].is_string());

        let decoded: LedgerEntry = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, entry);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_opaque_bytes_are_hex() {
        let data = EntryData::from(vec![0xde, 0xad]);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({"type": "opaque", "bytes": "dead"}));
        assert_eq!(data.kind(), "opaque");
        assert!(!data.is_token_mutation());
    }
}
