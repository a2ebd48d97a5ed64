//! Core ledger primitives for azora-ledger.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Hashing (SHA-256) and the process signing identity (Ed25519)
//! - Signed, hash-linked ledger entries
//! - Proof-of-work blocks
//! - Merkle aggregation and inclusion proofs
//! - Token records

pub mod block;
pub mod crypto;
pub mod entry;
pub mod hash;
pub mod merkle;
pub mod token;

// Re-export commonly used types at the crate root
pub use block::{Block, SealingHeader, GENESIS_DIFFICULTY, GENESIS_TIMESTAMP};
pub use crypto::{CryptoError, KeyManager, PublicKey, Signature};
pub use entry::{now_millis, EntryContext, EntryData, EntryError, LedgerEntry};
pub use hash::{decode_canonical_hex, hash, hash_concat, hash_json, Hash, H256};
pub use merkle::{entries_merkle_root, merkle_root, MerkleProof, MerkleTree};
pub use token::AzoraToken;
