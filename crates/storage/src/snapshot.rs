//! The persisted ledger image and the storage port it travels through.

use azora_core::{AzoraToken, Block, LedgerEntry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Everything needed to restore a ledger.
///
/// Tokens are kept as `[id, record]` pairs so the JSON form is an ordered
/// list rather than an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub chain: Vec<Block>,
    pub tokens: Vec<(String, AzoraToken)>,
    pub difficulty: u32,
    /// Entries not yet sealed into a block. Absent in older snapshots.
    #[serde(default)]
    pub pending: Vec<LedgerEntry>,
}

impl Snapshot {
    /// Number of entries across all blocks.
    pub fn sealed_entry_count(&self) -> usize {
        self.chain.iter().map(Block::entry_count).sum()
    }
}

/// Port through which the ledger loads and saves its snapshot.
///
/// Saves are full rewrites; a store holds at most one snapshot.
pub trait SnapshotStore {
    /// Load the stored snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self) -> Result<Option<Snapshot>> {
        (**self).load()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        (**self).save(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
