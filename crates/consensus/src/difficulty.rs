//! Difficulty retargeting from recent block times.

use azora_core::Block;
use serde::{Deserialize, Serialize};

/// Difficulty adjustment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Desired average time between blocks, in milliseconds.
    pub target_block_time_ms: u64,
    /// Number of most recent blocks averaged over.
    pub window: usize,
    /// Lowest difficulty the adjuster will set.
    pub min_difficulty: u32,
    /// Highest difficulty the adjuster will set.
    pub max_difficulty: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            target_block_time_ms: 30_000,
            window: 10,
            min_difficulty: 1,
            max_difficulty: 8,
        }
    }
}

/// Proportional difficulty controller.
///
/// Blocks arriving faster than 80% of the target raise the difficulty by
/// one, blocks slower than 120% lower it by one.
#[derive(Debug, Clone, Default)]
pub struct DifficultyAdjuster {
    config: DifficultyConfig,
}

impl DifficultyAdjuster {
    /// Create an adjuster with the given configuration.
    pub fn new(config: DifficultyConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    /// Average interval between the last `window` blocks.
    ///
    /// Returns `None` until the chain holds at least `window` blocks.
    pub fn average_block_time(&self, chain: &[Block]) -> Option<u64> {
        let window = self.config.window;
        if window < 2 || chain.len() < window {
            return None;
        }

        let recent = &chain[chain.len() - window..];
        let first = recent.first()?.timestamp;
        let last = recent.last()?.timestamp;
        Some(last.saturating_sub(first) / (window as u64 - 1))
    }

    /// Difficulty to use for the next block.
    pub fn next_difficulty(&self, chain: &[Block], current: u32) -> u32 {
        let current = current.clamp(self.config.min_difficulty, self.config.max_difficulty);
        let Some(average) = self.average_block_time(chain) else {
            return current;
        };

        let target = self.config.target_block_time_ms;
        let next = if average.saturating_mul(100) < target.saturating_mul(80) {
            current.saturating_add(1)
        } else if average.saturating_mul(100) > target.saturating_mul(120) {
            current.saturating_sub(1)
        } else {
            current
        };

        next.clamp(self.config.min_difficulty, self.config.max_difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azora_core::Hash;

    /// Chain of `n` blocks spaced `interval` milliseconds apart.
    fn chain_with_interval(n: usize, interval: u64) -> Vec<Block> {
        (0..n)
            .map(|i| {
                let timestamp = 1_000_000 + i as u64 * interval;
                Block::unsealed(i as u64, timestamp, Vec::new(), Hash::ZERO, 1, 50.0)
            })
            .collect()
    }

    #[test]
    fn test_no_adjustment_below_window() {
        let adjuster = DifficultyAdjuster::default();
        let chain = chain_with_interval(9, 1);
        assert_eq!(adjuster.average_block_time(&chain), None);
        assert_eq!(adjuster.next_difficulty(&chain, 3), 3);
    }

    #[test]
    fn test_fast_blocks_raise_difficulty() {
        let adjuster = DifficultyAdjuster::default();
        let chain = chain_with_interval(10, 1_000);
        assert_eq!(adjuster.average_block_time(&chain), Some(1_000));
        assert_eq!(adjuster.next_difficulty(&chain, 3), 4);
    }

    #[test]
    fn test_slow_blocks_lower_difficulty() {
        let adjuster = DifficultyAdjuster::default();
        let chain = chain_with_interval(12, 60_000);
        assert_eq!(adjuster.next_difficulty(&chain, 3), 2);
    }

    #[test]
    fn test_on_target_blocks_keep_difficulty() {
        let adjuster = DifficultyAdjuster::default();
        let chain = chain_with_interval(10, 30_000);
        assert_eq!(adjuster.next_difficulty(&chain, 3), 3);
    }

    #[test]
    fn test_bounds() {
        let adjuster = DifficultyAdjuster::default();
        let fast = chain_with_interval(10, 10);
        let slow = chain_with_interval(10, 1_000_000);
        assert_eq!(adjuster.next_difficulty(&fast, 8), 8);
        assert_eq!(adjuster.next_difficulty(&slow, 1), 1);
    }

    #[test]
    fn test_uses_only_last_window() {
        let adjuster = DifficultyAdjuster::default();
        // A long gap before the window does not count.
        let mut chain = chain_with_interval(1, 0);
        let tail: Vec<Block> = chain_with_interval(10, 1_000)
            .into_iter()
            .map(|mut b| {
                b.timestamp += 10_000_000;
                b
            })
            .collect();
        chain.extend(tail);
        assert_eq!(adjuster.average_block_time(&chain), Some(1_000));
    }
}
