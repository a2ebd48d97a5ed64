//! Pending pool for entries awaiting a block.
//!
//! The pool is strictly ordered: entries are sealed in the order they were
//! accepted, and each one links to the hash of the entry before it.

use azora_core::{Hash, LedgerEntry};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("entry {id} does not link to the pool tail")]
    BrokenLink { id: String },

    #[error("sealed batch of {sealed} entries is not a prefix of the pool")]
    SealedBatchMismatch { sealed: usize },
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Ordered, unbounded queue of signed entries.
#[derive(Debug, Clone, Default)]
pub struct PendingPool {
    entries: VecDeque<LedgerEntry>,
}

impl PendingPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a pool from persisted entries, checking their links.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Result<Self> {
        let mut pool = Self::new();
        for entry in entries {
            pool.push(entry)?;
        }
        Ok(pool)
    }

    /// Get the number of entries in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the newest entry, if any.
    pub fn tail_hash(&self) -> Option<Hash> {
        self.entries.back().map(|e| e.hash)
    }

    /// Append an entry. It must link to the current tail when the pool is
    /// not empty.
    pub fn push(&mut self, entry: LedgerEntry) -> Result<()> {
        if let Some(tail) = self.tail_hash() {
            if entry.previous_hash != tail {
                return Err(PoolError::BrokenLink { id: entry.id });
            }
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Copy of the oldest `limit` entries, the batch for the next block.
    pub fn front(&self, limit: usize) -> Vec<LedgerEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Remove a sealed batch from the front of the pool.
    ///
    /// Fails without modifying the pool if `sealed` is not exactly the
    /// pool's prefix.
    pub fn remove_sealed(&mut self, sealed: &[LedgerEntry]) -> Result<()> {
        let is_prefix = sealed.len() <= self.entries.len()
            && sealed
                .iter()
                .zip(self.entries.iter())
                .all(|(a, b)| a.hash == b.hash);
        if !is_prefix {
            return Err(PoolError::SealedBatchMismatch {
                sealed: sealed.len(),
            });
        }

        self.entries.drain(..sealed.len());
        Ok(())
    }

    /// Iterate entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    /// Get all entries, oldest first.
    pub fn to_vec(&self) -> Vec<LedgerEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azora_core::{EntryContext, EntryData, KeyManager};
    use serde_json::json;

    fn chain_of(keys: &KeyManager, n: u64) -> Vec<LedgerEntry> {
        let mut tail = Hash::ZERO;
        (0..n)
            .map(|i| {
                let entry = LedgerEntry::create(
                    format!("e{i}"),
                    EntryData::log("generic", json!(i)),
                    EntryContext {
                        previous_hash: tail,
                        sequence: i,
                        difficulty: 1,
                    },
                    keys,
                );
                tail = entry.hash;
                entry
            })
            .collect()
    }

    #[test]
    fn test_push_and_front() {
        let keys = KeyManager::generate().unwrap();
        let entries = chain_of(&keys, 5);
        let pool = PendingPool::from_entries(entries.clone()).unwrap();

        assert_eq!(pool.len(), 5);
        assert_eq!(pool.tail_hash(), Some(entries[4].hash));
        assert_eq!(pool.front(3), entries[..3].to_vec());
        assert_eq!(pool.front(10).len(), 5);
    }

    #[test]
    fn test_push_rejects_broken_link() {
        let keys = KeyManager::generate().unwrap();
        let mut entries = chain_of(&keys, 2);
        entries.swap(0, 1);
        let err = PendingPool::from_entries(entries).unwrap_err();
        assert_eq!(err, PoolError::BrokenLink { id: "e0".into() });
    }

    #[test]
    fn test_remove_sealed_prefix() {
        let keys = KeyManager::generate().unwrap();
        let entries = chain_of(&keys, 4);
        let mut pool = PendingPool::from_entries(entries.clone()).unwrap();

        pool.remove_sealed(&entries[..3]).unwrap();
        assert_eq!(pool.to_vec(), entries[3..].to_vec());
    }

    #[test]
    fn test_remove_non_prefix_leaves_pool_intact() {
        let keys = KeyManager::generate().unwrap();
        let entries = chain_of(&keys, 4);
        let mut pool = PendingPool::from_entries(entries.clone()).unwrap();

        let err = pool.remove_sealed(&entries[1..3]).unwrap_err();
        assert_eq!(err, PoolError::SealedBatchMismatch { sealed: 2 });
        assert_eq!(pool.len(), 4);
    }
}
