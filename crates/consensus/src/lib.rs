//! Proof-of-work consensus for azora-ledger.
//!
//! This crate provides:
//! - Nonce search with an attempt ceiling and optional deadline
//! - The halving miner reward schedule
//! - Difficulty retargeting from recent block times
//! - Full chain verification (links, hashes, Merkle roots, signatures, work)
//!
//! # Example
//!
//! ```rust,no_run
//! use azora_consensus::{ChainVerifier, Miner, MinerConfig};
//!
//! let miner = Miner::new(MinerConfig::default());
//! let genesis = miner.mine_genesis().into_block().unwrap();
//! let next = miner
//!     .mine_entries(1, genesis.hash, vec![], 2)
//!     .into_block()
//!     .unwrap();
//!
//! let chain = vec![genesis, next];
//! assert!(ChainVerifier::default().is_valid(&chain));
//! ```

pub mod difficulty;
pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use difficulty::{DifficultyAdjuster, DifficultyConfig};
pub use pow::{Miner, MinerConfig, MiningOutcome, RewardSchedule};
pub use validator::{ChainVerifier, VerificationError};
