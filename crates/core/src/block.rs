//! Proof-of-work sealed blocks.

use crate::entry::LedgerEntry;
use crate::hash::Hash;
use crate::merkle::entries_merkle_root;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Timestamp of the genesis block (2024-01-01T00:00:00Z, Unix millis).
pub const GENESIS_TIMESTAMP: u64 = 1_704_067_200_000;

/// Difficulty the genesis block is mined at.
pub const GENESIS_DIFFICULTY: u32 = 1;

/// A mined, sealed batch of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Entries sealed by this block, in pending-pool order.
    pub entries: Vec<LedgerEntry>,
    /// Hash of the previous block (zero for genesis).
    pub previous_hash: Hash,
    /// Proof-of-work hash of the header.
    pub hash: Hash,
    /// Nonce that satisfies `difficulty`.
    pub nonce: u64,
    /// Required number of leading hex zeros in `hash`.
    pub difficulty: u32,
    /// Merkle root of `entries`.
    pub merkle_root: Hash,
    /// Reward credited for sealing this block.
    pub miner_reward: f64,
}

/// The nonce-independent part of the header, as it is hashed.
///
/// Entries are summarized by their hashes; the nonce is appended last so
/// the miner can reuse a pre-fed hasher.
#[derive(Serialize)]
struct HeaderPreimage<'a> {
    index: u64,
    timestamp: u64,
    entry_hashes: Vec<&'a Hash>,
    previous_hash: &'a Hash,
    difficulty: u32,
    merkle_root: &'a Hash,
}

/// A hasher pre-loaded with the canonical header, waiting for a nonce.
#[derive(Clone)]
pub struct SealingHeader {
    prefix: Sha256,
}

impl SealingHeader {
    /// Hash the header with the given nonce.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_le_bytes());
        Hash(hasher.finalize().into())
    }
}

impl Block {
    /// Build an unsealed block (nonce 0, zero hash) over `entries`.
    pub fn unsealed(
        index: u64,
        timestamp: u64,
        entries: Vec<LedgerEntry>,
        previous_hash: Hash,
        difficulty: u32,
        miner_reward: f64,
    ) -> Self {
        let merkle_root = entries_merkle_root(&entries);

        Self {
            index,
            timestamp,
            entries,
            previous_hash,
            hash: Hash::ZERO,
            nonce: 0,
            difficulty,
            merkle_root,
            miner_reward,
        }
    }

    /// The fixed, not yet mined, genesis block.
    pub fn genesis_template(miner_reward: f64) -> Self {
        Self::unsealed(
            0,
            GENESIS_TIMESTAMP,
            Vec::new(),
            Hash::ZERO,
            GENESIS_DIFFICULTY,
            miner_reward,
        )
    }

    /// Prepare the header hasher for a nonce search.
    pub fn sealing_header(&self) -> SealingHeader {
        let preimage = HeaderPreimage {
            index: self.index,
            timestamp: self.timestamp,
            entry_hashes: self.entries.iter().map(|e| &e.hash).collect(),
            previous_hash: &self.previous_hash,
            difficulty: self.difficulty,
            merkle_root: &self.merkle_root,
        };
        let encoded = bincode::serialize(&preimage).expect("serialization should not fail");

        let mut prefix = Sha256::new();
        prefix.update(&encoded);
        SealingHeader { prefix }
    }

    /// Recompute the header hash from the block's fields.
    pub fn compute_hash(&self) -> Hash {
        self.sealing_header().hash_with_nonce(self.nonce)
    }

    /// Record a found nonce and its hash.
    pub fn seal(&mut self, nonce: u64, hash: Hash) {
        self.nonce = nonce;
        self.hash = hash;
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == Hash::ZERO
    }

    /// Get the number of entries in this block.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Verify the merkle root matches the entries.
    pub fn verify_merkle_root(&self) -> bool {
        entries_merkle_root(&self.entries) == self.merkle_root
    }

    /// Whether the stored hash satisfies the block's difficulty.
    pub fn meets_difficulty(&self) -> bool {
        self.hash.meets_difficulty(self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyManager;
    use crate::entry::{EntryContext, EntryData};
    use serde_json::json;

    fn entry(keys: &KeyManager, id: &str) -> LedgerEntry {
        LedgerEntry::create(
            id,
            EntryData::log("generic", json!(id)),
            EntryContext {
                previous_hash: Hash::ZERO,
                sequence: 0,
                difficulty: 1,
            },
            keys,
        )
    }

    #[test]
    fn test_genesis_template_is_fixed() {
        let a = Block::genesis_template(50.0);
        let b = Block::genesis_template(50.0);

        assert!(a.is_genesis());
        assert_eq!(a.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(a.difficulty, GENESIS_DIFFICULTY);
        assert!(a.entries.is_empty());
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_hash_depends_on_nonce() {
        let block = Block::genesis_template(50.0);
        let header = block.sealing_header();
        assert_ne!(header.hash_with_nonce(0), header.hash_with_nonce(1));
        assert_eq!(header.hash_with_nonce(0), block.compute_hash());
    }

    #[test]
    fn test_seal_records_nonce() {
        let mut block = Block::genesis_template(50.0);
        let hash = block.sealing_header().hash_with_nonce(42);
        block.seal(42, hash);
        assert_eq!(block.compute_hash(), block.hash);
    }

    #[test]
    fn test_merkle_root_verification() {
        let keys = KeyManager::generate().unwrap();
        let mut block = Block::unsealed(
            1,
            1_000,
            vec![entry(&keys, "a"), entry(&keys, "b")],
            Hash::ZERO,
            1,
            50.0,
        );
        assert!(block.verify_merkle_root());

        block.entries.swap(0, 1);
        assert!(!block.verify_merkle_root());
    }

    #[test]
    fn test_header_covers_entries() {
        let keys = KeyManager::generate().unwrap();
        let a = Block::unsealed(1, 1_000, vec![entry(&keys, "a")], Hash::ZERO, 1, 50.0);
        let b = Block::unsealed(1, 1_000, vec![entry(&keys, "b")], Hash::ZERO, 1, 50.0);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_json_field_names() {
        let block = Block::genesis_template(50.0);
        let value = serde_json::to_value(&block).unwrap();
        for field in ["index", "previousHash", "merkleRoot", "minerReward", "entries"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
