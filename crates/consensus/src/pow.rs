//! Proof-of-work block sealing.
//!
//! A block is sealed by searching for a nonce whose header hash starts with
//! `difficulty` hex zeros. The search is bounded by an attempt ceiling and an
//! optional deadline that is checked cooperatively inside the loop; running
//! out of either leaves the caller's entries untouched.

use azora_core::{now_millis, Block, Hash, LedgerEntry};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How often (in attempts) the deadline is checked.
const DEADLINE_CHECK_INTERVAL: u64 = 4096;

/// Geometric miner reward schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    /// Reward for blocks before the first halving.
    pub base: f64,
    /// Number of blocks between halvings.
    pub halving_interval: u64,
    /// Lower bound on the reward.
    pub floor: f64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            base: 50.0,
            halving_interval: 1000,
            floor: 0.01,
        }
    }
}

impl RewardSchedule {
    /// `max(base / 2^floor(index / halving_interval), floor)`.
    pub fn reward_at(&self, index: u64) -> f64 {
        let halvings = index
            .checked_div(self.halving_interval)
            .unwrap_or(0)
            .min(i32::MAX as u64) as i32;
        (self.base * 0.5f64.powi(halvings)).max(self.floor)
    }
}

/// Miner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Nonce ceiling; the search gives up after this many attempts.
    pub max_attempts: u64,
    /// Optional wall-clock budget for one search, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Reward schedule applied to sealed blocks.
    pub rewards: RewardSchedule,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10_000_000,
            timeout_ms: None,
            rewards: RewardSchedule::default(),
        }
    }
}

/// Result of a nonce search.
#[derive(Debug, Clone, PartialEq)]
pub enum MiningOutcome {
    /// A nonce was found; the block is sealed.
    Sealed(Block),
    /// The attempt ceiling was reached.
    Exhausted { attempts: u64 },
    /// The deadline passed before a nonce was found.
    TimedOut { attempts: u64 },
}

impl MiningOutcome {
    /// The sealed block, if mining succeeded.
    pub fn into_block(self) -> Option<Block> {
        match self {
            Self::Sealed(block) => Some(block),
            _ => None,
        }
    }

    /// Check if mining succeeded.
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed(_))
    }
}

/// Proof-of-work miner.
#[derive(Debug, Clone, Default)]
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    /// Create a miner with the given configuration.
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Build a block over `entries` stamped with the current time and seal it.
    pub fn mine_entries(
        &self,
        index: u64,
        previous_hash: Hash,
        entries: Vec<LedgerEntry>,
        difficulty: u32,
    ) -> MiningOutcome {
        let reward = self.config.rewards.reward_at(index);
        let block = Block::unsealed(
            index,
            now_millis(),
            entries,
            previous_hash,
            difficulty,
            reward,
        );
        self.seal(block)
    }

    /// Mine the fixed genesis block.
    pub fn mine_genesis(&self) -> MiningOutcome {
        self.seal(Block::genesis_template(self.config.rewards.reward_at(0)))
    }

    /// Search for a nonce satisfying the block's difficulty.
    pub fn seal(&self, mut block: Block) -> MiningOutcome {
        let header = block.sealing_header();
        let deadline = self
            .config
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        for nonce in 0..self.config.max_attempts {
            let hash = header.hash_with_nonce(nonce);
            if hash.meets_difficulty(block.difficulty) {
                tracing::debug!(
                    index = block.index,
                    nonce,
                    difficulty = block.difficulty,
                    "nonce found"
                );
                block.seal(nonce, hash);
                return MiningOutcome::Sealed(block);
            }

            if let Some(deadline) = deadline {
                if nonce % DEADLINE_CHECK_INTERVAL == DEADLINE_CHECK_INTERVAL - 1
                    && Instant::now() >= deadline
                {
                    return MiningOutcome::TimedOut {
                        attempts: nonce + 1,
                    };
                }
            }
        }

        MiningOutcome::Exhausted {
            attempts: self.config.max_attempts,
        }
    }
}
