//! Snapshot persistence for azora-ledger.
//!
//! The ledger is persisted as one [`Snapshot`]: the chain, the token index,
//! the current difficulty and the pending pool. Every save is a full rewrite.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    LedgerEngine                          │
//! └────────────────────────┬────────────────────────────────┘
//!                          │ SnapshotStore { load, save }
//! ┌────────────────────────▼────────────────────────────────┐
//! │  ┌───────────────┐  ┌─────────────┐  ┌───────────────┐  │
//! │  │ JsonFileStore │  │ SledStore   │  │ MemoryStore   │  │
//! │  │  - ledger.json│  │  - sled db  │  │  - tests      │  │
//! │  │  - tmp+rename │  │  - batch    │  │               │  │
//! │  └───────────────┘  └─────────────┘  └───────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use azora_storage::{JsonFileStore, SnapshotStore};
//!
//! let store = JsonFileStore::in_dir("./ledger_data");
//! match store.load().unwrap() {
//!     Some(snapshot) => println!("{} blocks", snapshot.chain.len()),
//!     None => println!("no ledger yet"),
//! }
//! ```

pub mod db;
pub mod file;
pub mod memory;
pub mod snapshot;

// Re-export commonly used types
pub use db::SledStore;
pub use file::{JsonFileStore, SNAPSHOT_FILE};
pub use memory::MemoryStore;
pub use snapshot::{Result, Snapshot, SnapshotStore, StorageError};
