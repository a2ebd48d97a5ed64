//! Chain verification rules.
//!
//! Verification replays every hash, signature, Merkle root and proof of work
//! from the genesis block forward and stops at the first violation.

use crate::pow::RewardSchedule;
use azora_core::{Block, EntryError, Hash};
use thiserror::Error;

/// The first integrity violation found in a chain.
#[derive(Debug, Error, PartialEq)]
pub enum VerificationError {
    #[error("chain has no genesis block")]
    EmptyChain,

    #[error("block at position {position} has index {got}")]
    IndexMismatch { position: u64, got: u64 },

    #[error("block {index}: previous hash does not link to block {}", .index.saturating_sub(1))]
    BrokenLink { index: u64 },

    #[error("block {index}: stored hash does not match its header")]
    HashMismatch { index: u64 },

    #[error("block {index}: merkle root does not match its entries")]
    MerkleRootMismatch { index: u64 },

    #[error("block {index}: hash has fewer than {difficulty} leading zeros")]
    InsufficientWork { index: u64, difficulty: u32 },

    #[error("block {index}: miner reward {actual} differs from scheduled {expected}")]
    RewardMismatch {
        index: u64,
        expected: f64,
        actual: f64,
    },

    #[error("block {index}: {source}")]
    InvalidEntry {
        index: u64,
        #[source]
        source: EntryError,
    },

    #[error("block {index}: entry {entry_id} does not link to the preceding entry")]
    EntryLinkBroken { index: u64, entry_id: String },
}

impl VerificationError {
    /// Index of the offending block, when the error concerns one.
    pub fn block_index(&self) -> Option<u64> {
        match self {
            Self::EmptyChain => None,
            Self::IndexMismatch { position, .. } => Some(*position),
            Self::BrokenLink { index }
            | Self::HashMismatch { index }
            | Self::MerkleRootMismatch { index }
            | Self::InsufficientWork { index, .. }
            | Self::RewardMismatch { index, .. }
            | Self::InvalidEntry { index, .. }
            | Self::EntryLinkBroken { index, .. } => Some(*index),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerificationError>;

/// Read-only chain verifier.
#[derive(Debug, Clone, Default)]
pub struct ChainVerifier {
    rewards: RewardSchedule,
}

impl ChainVerifier {
    /// Create a verifier that checks rewards against `rewards`.
    pub fn new(rewards: RewardSchedule) -> Self {
        Self { rewards }
    }

    /// Verify the whole chain, fail-fast.
    ///
    /// On success returns the hash of the last entry in the chain (or the
    /// zero sentinel), which is where the pending pool must link to.
    pub fn verify(&self, chain: &[Block]) -> Result<Hash> {
        if chain.is_empty() {
            return Err(VerificationError::EmptyChain);
        }

        let mut previous_hash = Hash::ZERO;
        let mut entry_tail = Hash::ZERO;

        for (position, block) in chain.iter().enumerate() {
            let position = position as u64;
            if block.index != position {
                return Err(VerificationError::IndexMismatch {
                    position,
                    got: block.index,
                });
            }
            if block.previous_hash != previous_hash {
                return Err(VerificationError::BrokenLink { index: block.index });
            }

            self.verify_block_contents(block)?;
            entry_tail = Self::verify_entry_links(block, entry_tail)?;
            previous_hash = block.hash;
        }

        Ok(entry_tail)
    }

    /// Boolean form of [`ChainVerifier::verify`].
    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.verify(chain).is_ok()
    }

    /// Checks that depend only on the block itself.
    pub fn verify_block_contents(&self, block: &Block) -> Result<()> {
        let index = block.index;

        if block.compute_hash() != block.hash {
            return Err(VerificationError::HashMismatch { index });
        }

        if !block.verify_merkle_root() {
            return Err(VerificationError::MerkleRootMismatch { index });
        }

        for entry in &block.entries {
            entry
                .verify()
                .map_err(|source| VerificationError::InvalidEntry { index, source })?;
        }

        if !block.meets_difficulty() {
            return Err(VerificationError::InsufficientWork {
                index,
                difficulty: block.difficulty,
            });
        }

        let expected = self.rewards.reward_at(index);
        if (expected - block.miner_reward).abs() > f64::EPSILON {
            return Err(VerificationError::RewardMismatch {
                index,
                expected,
                actual: block.miner_reward,
            });
        }

        Ok(())
    }

    /// Check that each entry's `previous_hash` is the hash of the entry
    /// before it, starting from `tail`. Returns the new tail.
    fn verify_entry_links(block: &Block, mut tail: Hash) -> Result<Hash> {
        for entry in &block.entries {
            if entry.previous_hash != tail {
                return Err(VerificationError::EntryLinkBroken {
                    index: block.index,
                    entry_id: entry.id.clone(),
                });
            }
            tail = entry.hash;
        }
        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{Miner, MinerConfig};
    use azora_core::{EntryContext, EntryData, KeyManager, LedgerEntry};
    use serde_json::json;

    /// Build a valid chain with `blocks` non-genesis blocks of two entries each.
    fn build_chain(blocks: u64) -> Vec<Block> {
        let miner = Miner::new(MinerConfig::default());
        let keys = KeyManager::generate().unwrap();
        let mut chain = vec![miner.mine_genesis().into_block().unwrap()];
        let mut tail = Hash::ZERO;
        let mut sequence = 0;

        for index in 1..=blocks {
            let mut entries = Vec::new();
            for _ in 0..2 {
                let entry = LedgerEntry::create(
                    format!("entry-{sequence}"),
                    EntryData::log("audit", json!({ "seq": sequence })),
                    EntryContext {
                        previous_hash: tail,
                        sequence,
                        difficulty: 1,
                    },
                    &keys,
                );
                tail = entry.hash;
                sequence += 1;
                entries.push(entry);
            }
            let previous = chain.last().unwrap().hash;
            let block = miner
                .mine_entries(index, previous, entries, 1)
                .into_block()
                .unwrap();
            chain.push(block);
        }
        chain
    }

    /// Re-seal a block after tampering so only deeper checks can catch it.
    fn reseal(block: &mut Block) {
        let miner = Miner::default();
        *block = miner.seal(block.clone()).into_block().unwrap();
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        let chain = build_chain(0);
        assert_eq!(ChainVerifier::default().verify(&chain), Ok(Hash::ZERO));
    }

    #[test]
    fn test_valid_chain_returns_entry_tail() {
        let chain = build_chain(3);
        let tail = chain.last().unwrap().entries.last().unwrap().hash;
        assert_eq!(ChainVerifier::default().verify(&chain), Ok(tail));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert_eq!(
            ChainVerifier::default().verify(&[]),
            Err(VerificationError::EmptyChain)
        );
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = build_chain(2);
        chain[2].previous_hash = Hash::ZERO;
        reseal(&mut chain[2]);
        assert_eq!(
            ChainVerifier::default().verify(&chain),
            Err(VerificationError::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn test_index_gap_detected() {
        let mut chain = build_chain(2);
        chain.remove(1);
        let err = ChainVerifier::default().verify(&chain).unwrap_err();
        assert_eq!(err, VerificationError::IndexMismatch { position: 1, got: 2 });
        assert_eq!(err.block_index(), Some(1));
    }

    #[test]
    fn test_header_tamper_detected() {
        let mut chain = build_chain(1);
        chain[1].timestamp += 1;
        assert_eq!(
            ChainVerifier::default().verify(&chain),
            Err(VerificationError::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn test_entry_tamper_detected() {
        let mut chain = build_chain(2);
        chain[1].entries[0].data = EntryData::log("audit", json!({ "seq": 999 }));
        let err = ChainVerifier::default().verify(&chain).unwrap_err();
        // The merkle root no longer matches before the entry itself is checked.
        assert_eq!(err, VerificationError::MerkleRootMismatch { index: 1 });

        let root = azora_core::entries_merkle_root(&chain[1].entries);
        chain[1].merkle_root = root;
        reseal(&mut chain[1]);
        let err = ChainVerifier::default().verify(&chain).unwrap_err();
        assert!(matches!(
            err,
            VerificationError::InvalidEntry {
                index: 1,
                source: EntryError::HashMismatch { .. }
            }
        ));
    }

    #[test]
    fn test_insufficient_work_detected() {
        let mut chain = build_chain(1);
        // Claim more work than was done and refresh the hash to match.
        chain[1].difficulty = 64;
        chain[1].hash = chain[1].compute_hash();
        assert_eq!(
            ChainVerifier::default().verify(&chain),
            Err(VerificationError::InsufficientWork {
                index: 1,
                difficulty: 64
            })
        );
    }

    #[test]
    fn test_reward_tamper_detected() {
        let mut chain = build_chain(1);
        chain[1].miner_reward = 1_000.0;
        assert!(matches!(
            ChainVerifier::default().verify(&chain),
            Err(VerificationError::RewardMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_entry_reordering_across_blocks_detected() {
        let mut chain = build_chain(2);
        let moved = chain[2].entries.remove(0);
        chain[1].entries.push(moved);
        for i in 1..=2 {
            chain[i].merkle_root = azora_core::entries_merkle_root(&chain[i].entries);
            reseal(&mut chain[i]);
        }
        chain[2].previous_hash = chain[1].hash;
        reseal(&mut chain[2]);

        assert!(ChainVerifier::default().is_valid(&chain));

        chain[1].entries.swap(0, 1);
        chain[1].merkle_root = azora_core::entries_merkle_root(&chain[1].entries);
        reseal(&mut chain[1]);
        chain[2].previous_hash = chain[1].hash;
        reseal(&mut chain[2]);
        assert!(matches!(
            ChainVerifier::default().verify(&chain),
            Err(VerificationError::EntryLinkBroken { index: 1, .. })
        ));
    }
}
