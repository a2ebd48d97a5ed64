//! Ledger orchestration for azora-ledger.
//!
//! This crate brings together all components into a working ledger:
//! - **Pending pool**: ordered entries waiting for a block
//! - **Token index**: balances derived from `mint`/`transfer` entries
//! - **Mining worker**: proof-of-work search on a dedicated thread
//! - **Engine**: entry signing, block sealing, verification and persistence
//!
//! # Example
//!
//! ```rust,no_run
//! use azora_chain::{LedgerConfig, LedgerEngine};
//! use azora_storage::JsonFileStore;
//! use serde_json::json;
//!
//! let store = JsonFileStore::in_dir("./ledger_data");
//! let mut ledger = LedgerEngine::open(store, LedgerConfig::default()).unwrap();
//!
//! ledger.add_entry("kyc-1", json!({ "client": 42, "status": "approved" })).unwrap();
//! ledger.mint_token("client-42", "alice", 1000).unwrap();
//! ledger.transfer_token("client-42", "alice", "bob", 400).unwrap();
//!
//! assert!(ledger.verify_chain());
//! println!("{:?}", ledger.stats());
//! ```

pub mod engine;
pub mod pool;
pub mod tokens;
pub mod worker;

// Re-export commonly used types
pub use engine::{LedgerConfig, LedgerEngine, LedgerError, LedgerStats, MiningMode, Result};
pub use pool::{PendingPool, PoolError};
pub use tokens::{TokenIndex, TransferRejection};
pub use worker::{MiningJob, MiningResult, MiningWorker, WorkerError};
