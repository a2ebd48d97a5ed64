//! The ledger engine.
//!
//! This module brings together all components: key manager, pending pool,
//! token index, mining worker, difficulty adjuster, verifier and storage.

use crate::pool::{PendingPool, PoolError};
use crate::tokens::TokenIndex;
use crate::worker::{MiningJob, MiningResult, MiningWorker, WorkerError};
use azora_consensus::{
    ChainVerifier, DifficultyAdjuster, DifficultyConfig, Miner, MinerConfig, MiningOutcome,
    VerificationError,
};
use azora_core::{
    AzoraToken, Block, CryptoError, EntryContext, EntryData, Hash, KeyManager, LedgerEntry,
    MerkleProof, MerkleTree, PublicKey,
};
use azora_storage::{Snapshot, SnapshotStore, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("key error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("mining worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("pending pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("genesis block could not be mined")]
    GenesisMining,

    #[error("snapshot holds no genesis block")]
    EmptySnapshot,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// How `add_entry` drives the miner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    /// Wait for the mining thread before returning.
    #[default]
    Blocking,
    /// Return immediately; results are applied by `poll_mining` or
    /// `wait_for_mining`.
    Background,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Pending entries that trigger mining, and the block size limit.
    pub max_entries_per_block: usize,
    /// Difficulty for the first block after genesis.
    pub initial_difficulty: u32,
    pub mining_mode: MiningMode,
    /// Verify the loaded chain on open and log any failure.
    pub verify_on_load: bool,
    pub miner: MinerConfig,
    pub difficulty: DifficultyConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_entries_per_block: 10,
            initial_difficulty: 2,
            mining_mode: MiningMode::Blocking,
            verify_on_load: true,
            miner: MinerConfig::default(),
            difficulty: DifficultyConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_block == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_entries_per_block must be at least 1".into(),
            ));
        }
        if self.difficulty.min_difficulty > self.difficulty.max_difficulty {
            return Err(LedgerError::InvalidConfig(format!(
                "min_difficulty {} exceeds max_difficulty {}",
                self.difficulty.min_difficulty, self.difficulty.max_difficulty
            )));
        }
        Ok(())
    }
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_blocks: usize,
    /// Entries sealed into blocks.
    pub total_entries: usize,
    pub current_difficulty: u32,
    pub total_tokens: usize,
    pub is_valid: bool,
    pub pending_entries: usize,
    pub latest_hash: Hash,
    /// Mining attempts that ran out of nonces or time since open.
    pub mining_failures: u64,
}

/// Single-writer ledger: chain, pending pool and token index.
///
/// All mutation goes through `&mut self`. Callers sharing an engine across
/// threads wrap it in a single `Mutex`.
pub struct LedgerEngine<S: SnapshotStore> {
    config: LedgerConfig,
    keys: KeyManager,
    store: S,
    chain: Vec<Block>,
    pending: PendingPool,
    tokens: TokenIndex,
    difficulty: u32,
    /// Sequence number for the next entry.
    next_sequence: u64,
    adjuster: DifficultyAdjuster,
    verifier: ChainVerifier,
    worker: MiningWorker,
    mining_failures: u64,
}

impl<S: SnapshotStore> LedgerEngine<S> {
    /// Open a ledger from `store`, mining the genesis block if the store is
    /// empty.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let keys = KeyManager::generate()?;
        let miner = Miner::new(config.miner.clone());
        let verifier = ChainVerifier::new(config.miner.rewards);
        let adjuster = DifficultyAdjuster::new(config.difficulty.clone());

        let (chain, tokens, difficulty, pending, fresh) = match store.load()? {
            Some(snapshot) => {
                if snapshot.chain.is_empty() {
                    return Err(LedgerError::EmptySnapshot);
                }
                let pending = PendingPool::from_entries(snapshot.pending)?;
                let tokens = TokenIndex::from_pairs(snapshot.tokens);
                (snapshot.chain, tokens, snapshot.difficulty, pending, false)
            }
            None => {
                let genesis = miner
                    .mine_genesis()
                    .into_block()
                    .ok_or(LedgerError::GenesisMining)?;
                tracing::info!(hash = %genesis.hash, "genesis block mined");
                let difficulty = config.initial_difficulty.clamp(
                    config.difficulty.min_difficulty,
                    config.difficulty.max_difficulty,
                );
                (vec![genesis], TokenIndex::new(), difficulty, PendingPool::new(), true)
            }
        };

        let sealed: usize = chain.iter().map(Block::entry_count).sum();
        let next_sequence = (sealed + pending.len()) as u64;

        let mut engine = Self {
            worker: MiningWorker::spawn(miner)?,
            config,
            keys,
            store,
            chain,
            pending,
            tokens,
            difficulty,
            next_sequence,
            adjuster,
            verifier,
            mining_failures: 0,
        };

        if fresh {
            engine.save_snapshot()?;
        } else if engine.config.verify_on_load {
            engine.check_loaded_state();
        }

        tracing::info!(
            store = %engine.store.describe(),
            blocks = engine.chain.len(),
            pending = engine.pending.len(),
            difficulty = engine.difficulty,
            "ledger opened"
        );
        Ok(engine)
    }

    /// Log any integrity problems in freshly loaded state.
    fn check_loaded_state(&self) {
        if let Err(err) = self.verify_chain_detailed() {
            tracing::warn!(error = %err, "loaded chain failed verification");
        }
        if let Some(first) = self.pending.iter().next() {
            if first.previous_hash != self.sealed_tail_hash() {
                tracing::warn!(entry = %first.id, "pending pool does not link to the sealed chain");
            }
        }
        let (replayed, _) = self.replay_tokens();
        if replayed != self.tokens {
            tracing::warn!("stored token index differs from the replay of ledger entries");
        }
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Build and sign the next entry without recording it.
    pub fn create_entry(&self, id: impl Into<String>, data: impl Into<EntryData>) -> LedgerEntry {
        let context = EntryContext {
            previous_hash: self.entry_tail_hash(),
            sequence: self.next_sequence,
            difficulty: self.difficulty,
        };
        LedgerEntry::create(id, data.into(), context, &self.keys)
    }

    /// Record an entry, persist, and mine if the pool is full.
    pub fn add_entry(
        &mut self,
        id: impl Into<String>,
        data: impl Into<EntryData>,
    ) -> Result<LedgerEntry> {
        let entry = self.create_entry(id, data);
        self.pending.push(entry.clone())?;
        self.next_sequence += 1;

        tracing::debug!(
            id = %entry.id,
            kind = entry.data.kind(),
            hash = %entry.hash,
            pending = self.pending.len(),
            "entry added"
        );

        let persisted = match self.config.mining_mode {
            MiningMode::Blocking => self.mine_while_full()?,
            MiningMode::Background => {
                let applied = self.poll_mining()?.is_some();
                self.start_mining_if_full()?;
                applied
            }
        };
        if !persisted {
            self.save_snapshot()?;
        }

        Ok(entry)
    }

    /// Hash the next entry must link to.
    fn entry_tail_hash(&self) -> Hash {
        self.pending
            .tail_hash()
            .unwrap_or_else(|| self.sealed_tail_hash())
    }

    /// Hash of the last sealed entry, or zero if no block holds entries.
    fn sealed_tail_hash(&self) -> Hash {
        self.chain
            .iter()
            .rev()
            .find_map(|block| block.entries.last())
            .map(|entry| entry.hash)
            .unwrap_or(Hash::ZERO)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Create or overwrite a token record and record a `mint` entry.
    pub fn mint_token(&mut self, id: &str, owner: &str, amount: u64) -> Result<AzoraToken> {
        let token = self.tokens.mint(id, owner, amount);
        let entry_id = format!("mint-{}-{}", id, self.next_sequence);
        self.add_entry(
            entry_id,
            EntryData::Mint {
                token_id: id.to_string(),
                owner: owner.to_string(),
                amount,
            },
        )?;
        Ok(token)
    }

    /// Move `amount` of `id` from `from` to `to`.
    ///
    /// Returns `Ok(false)` without touching any state if the token is
    /// missing, not owned by `from`, or short of `amount`, or if the
    /// recipient record id is already held by another owner.
    pub fn transfer_token(&mut self, id: &str, from: &str, to: &str, amount: u64) -> Result<bool> {
        let recipient_token_id = match self.tokens.transfer(id, from, to, amount) {
            Ok(recipient) => recipient,
            Err(rejection) => {
                tracing::warn!(
                    token = id,
                    from,
                    to,
                    amount,
                    reason = %rejection,
                    "transfer rejected"
                );
                return Ok(false);
            }
        };

        let entry_id = format!("transfer-{}-{}", id, self.next_sequence);
        self.add_entry(
            entry_id,
            EntryData::Transfer {
                token_id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                amount,
                recipient_token_id,
            },
        )?;
        Ok(true)
    }

    /// Get a token record.
    pub fn get_token(&self, id: &str) -> Option<&AzoraToken> {
        self.tokens.get(id)
    }

    /// All token records in id order.
    pub fn tokens(&self) -> impl Iterator<Item = &AzoraToken> {
        self.tokens.iter()
    }

    fn replay_tokens(&self) -> (TokenIndex, usize) {
        let sealed = self.chain.iter().flat_map(|block| block.entries.iter());
        TokenIndex::replay(sealed.chain(self.pending.iter()))
    }

    /// Replace the token index with the replay of all recorded entries.
    ///
    /// Returns the number of token entries replayed.
    pub fn rebuild_token_index(&mut self) -> Result<usize> {
        let (tokens, applied) = self.replay_tokens();
        if tokens != self.tokens {
            tracing::info!(records = tokens.len(), "token index rebuilt with changes");
        }
        self.tokens = tokens;
        self.save_snapshot()?;
        Ok(applied)
    }

    // =========================================================================
    // Mining
    // =========================================================================

    /// Seal pending entries (up to the block limit) regardless of the
    /// threshold, waiting for the result.
    ///
    /// A job already in flight is finished first; if it seals a block, that
    /// block is returned. Returns `None` if nothing was pending or the
    /// search failed.
    pub fn mine_pending(&mut self) -> Result<Option<Block>> {
        if let Some(block) = self.wait_for_mining()? {
            return Ok(Some(block));
        }
        if !self.submit_batch()? {
            return Ok(None);
        }
        self.wait_for_mining()
    }

    /// Apply a finished background job, if any.
    pub fn poll_mining(&mut self) -> Result<Option<Block>> {
        match self.worker.try_recv()? {
            Some(result) => self.apply_mining_result(result),
            None => Ok(None),
        }
    }

    /// Block until the in-flight job (if any) finishes and apply it.
    pub fn wait_for_mining(&mut self) -> Result<Option<Block>> {
        match self.worker.recv()? {
            Some(result) => self.apply_mining_result(result),
            None => Ok(None),
        }
    }

    /// Apply in-flight jobs until the worker is idle. A sealed block may
    /// start the next job when the pool is still full.
    pub fn finish_mining(&mut self) -> Result<()> {
        while self.worker.is_busy() {
            self.wait_for_mining()?;
        }
        Ok(())
    }

    /// Check if a background job is running.
    pub fn is_mining(&self) -> bool {
        self.worker.is_busy()
    }

    /// Mine full batches until the pool drops below the threshold or a
    /// search fails. Returns true if a snapshot was written.
    fn mine_while_full(&mut self) -> Result<bool> {
        let mut persisted = false;
        while self.pending.len() >= self.config.max_entries_per_block {
            if !self.submit_batch()? {
                break;
            }
            match self.wait_for_mining()? {
                Some(_) => persisted = true,
                None => break,
            }
        }
        Ok(persisted)
    }

    fn start_mining_if_full(&mut self) -> Result<()> {
        if self.pending.len() >= self.config.max_entries_per_block {
            self.submit_batch()?;
        }
        Ok(())
    }

    /// Freeze the oldest pending entries into a job. Returns false if the
    /// pool is empty or a job is already running.
    fn submit_batch(&mut self) -> Result<bool> {
        if self.pending.is_empty() || self.worker.is_busy() {
            return Ok(false);
        }
        let job = MiningJob {
            index: self.chain.len() as u64,
            previous_hash: self.tip().hash,
            entries: self.pending.front(self.config.max_entries_per_block),
            difficulty: self.difficulty,
        };
        self.worker.submit(job)?;
        Ok(true)
    }

    fn apply_mining_result(&mut self, result: MiningResult) -> Result<Option<Block>> {
        let block = match result.outcome {
            MiningOutcome::Sealed(block) => block,
            MiningOutcome::Exhausted { attempts } | MiningOutcome::TimedOut { attempts } => {
                self.mining_failures += 1;
                tracing::warn!(
                    index = result.index,
                    batch_len = result.batch_len,
                    attempts,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "mining gave up; entries stay pending"
                );
                return Ok(None);
            }
        };

        if block.index != self.chain.len() as u64 || block.previous_hash != self.tip().hash {
            tracing::warn!(index = block.index, "discarding stale mined block");
            return Ok(None);
        }

        self.pending.remove_sealed(&block.entries)?;
        self.chain.push(block.clone());

        tracing::info!(
            index = block.index,
            hash = %block.hash,
            entries = block.entry_count(),
            nonce = block.nonce,
            difficulty = block.difficulty,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "block sealed"
        );

        let next = self.adjuster.next_difficulty(&self.chain, self.difficulty);
        if next != self.difficulty {
            tracing::info!(from = self.difficulty, to = next, "difficulty adjusted");
            self.difficulty = next;
        }

        self.save_snapshot()?;

        if self.config.mining_mode == MiningMode::Background {
            self.start_mining_if_full()?;
        }
        Ok(Some(block))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The full chain, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Entries waiting for a block, oldest first.
    pub fn pending_entries(&self) -> Vec<LedgerEntry> {
        self.pending.to_vec()
    }

    /// Get a block by index.
    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    /// The newest block.
    pub fn latest_block(&self) -> &Block {
        self.tip()
    }

    /// Up to `count` newest blocks, newest first.
    pub fn recent_blocks(&self, count: usize) -> Vec<&Block> {
        self.chain.iter().rev().take(count).collect()
    }

    fn tip(&self) -> &Block {
        // open() guarantees at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    /// Find an entry by id, sealed or pending. Returns the block index for
    /// sealed entries.
    pub fn find_entry(&self, entry_id: &str) -> Option<(Option<u64>, &LedgerEntry)> {
        self.chain
            .iter()
            .find_map(|block| {
                block
                    .entries
                    .iter()
                    .find(|e| e.id == entry_id)
                    .map(|e| (Some(block.index), e))
            })
            .or_else(|| self.pending.iter().find(|e| e.id == entry_id).map(|e| (None, e)))
    }

    /// Merkle inclusion proof for a sealed entry.
    pub fn entry_proof(&self, entry_id: &str) -> Option<(u64, MerkleProof)> {
        self.chain.iter().find_map(|block| {
            let position = block.entries.iter().position(|e| e.id == entry_id)?;
            let proof = MerkleTree::from_entries(&block.entries).proof(position)?;
            Some((block.index, proof))
        })
    }

    /// Current mining difficulty.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Key this process signs entries with.
    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the snapshot store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the snapshot store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Finish any in-flight mining job, persist its block, and return the
    /// store.
    ///
    /// Dropping an engine instead discards a block that was still being
    /// sealed; its entries stay in the persisted pending pool.
    pub fn close(mut self) -> Result<S> {
        self.finish_mining()?;
        Ok(self.store)
    }

    /// Like [`LedgerEngine::close`], logging a failure to finish the
    /// in-flight job instead of returning it.
    pub fn into_store(mut self) -> S {
        if let Err(err) = self.finish_mining() {
            tracing::error!(error = %err, "failed to finish mining before shutdown");
        }
        self.store
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Replay every hash, signature, Merkle root and proof of work.
    pub fn verify_chain(&self) -> bool {
        match self.verify_chain_detailed() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    block = ?err.block_index(),
                    "chain verification failed"
                );
                false
            }
        }
    }

    /// Like [`LedgerEngine::verify_chain`], reporting the first failure.
    pub fn verify_chain_detailed(&self) -> std::result::Result<(), VerificationError> {
        self.verifier.verify(&self.chain).map(|_| ())
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_blocks: self.chain.len(),
            total_entries: self.chain.iter().map(Block::entry_count).sum(),
            current_difficulty: self.difficulty,
            total_tokens: self.tokens.len(),
            is_valid: self.verify_chain(),
            pending_entries: self.pending.len(),
            latest_hash: self.tip().hash,
            mining_failures: self.mining_failures,
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Current state as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            chain: self.chain.clone(),
            tokens: self.tokens.to_pairs(),
            difficulty: self.difficulty,
            pending: self.pending.to_vec(),
        }
    }

    /// Write the full state to the store.
    ///
    /// On failure the in-memory state is kept and the error returned.
    pub fn save_snapshot(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        if let Err(err) = self.store.save(&snapshot) {
            tracing::error!(
                store = %self.store.describe(),
                error = %err,
                "failed to persist snapshot"
            );
            return Err(err.into());
        }
        Ok(())
    }
}

impl<S: SnapshotStore> std::fmt::Debug for LedgerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("blocks", &self.chain.len())
            .field("pending", &self.pending.len())
            .field("tokens", &self.tokens.len())
            .field("difficulty", &self.difficulty)
            .field("worker", &self.worker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azora_storage::MemoryStore;
    use serde_json::json;

    fn config() -> LedgerConfig {
        LedgerConfig {
            initial_difficulty: 1,
            ..LedgerConfig::default()
        }
    }

    fn open() -> LedgerEngine<MemoryStore> {
        LedgerEngine::open(MemoryStore::new(), config()).unwrap()
    }

    #[test]
    fn test_open_mines_genesis_and_persists() {
        let engine = open();
        assert_eq!(engine.chain().len(), 1);
        let genesis = &engine.chain()[0];
        assert!(genesis.is_genesis());
        assert_eq!(genesis.miner_reward, 50.0);
        assert_eq!(engine.store().save_count(), 1);
        assert!(engine.verify_chain());
    }

    #[test]
    fn test_entries_link_in_order() {
        let mut engine = open();
        let a = engine.add_entry("a", json!({"n": 1})).unwrap();
        let b = engine.add_entry("b", json!({"n": 2})).unwrap();

        assert_eq!(a.previous_hash, Hash::ZERO);
        assert_eq!(b.previous_hash, a.hash);
        assert_eq!((a.nonce, b.nonce), (0, 1));
        assert_eq!(engine.pending_entries().len(), 2);
    }

    #[test]
    fn test_entry_chain_continues_across_blocks() {
        let mut engine = open();
        for i in 0..10 {
            engine.add_entry(format!("e{i}"), json!(i)).unwrap();
        }
        assert_eq!(engine.chain().len(), 2);

        let sealed_tail = engine.chain()[1].entries[9].hash;
        let next = engine.add_entry("e10", json!(10)).unwrap();
        assert_eq!(next.previous_hash, sealed_tail);
        assert_eq!(next.nonce, 10);
    }

    #[test]
    fn test_mine_pending_below_threshold() {
        let mut engine = open();
        engine.add_entry("a", json!(1)).unwrap();
        engine.add_entry("b", json!(2)).unwrap();

        let block = engine.mine_pending().unwrap().unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.entry_count(), 2);
        assert!(engine.pending_entries().is_empty());
        assert!(engine.mine_pending().unwrap().is_none());
    }

    #[test]
    fn test_mining_failure_keeps_entries_pending() {
        // Mine genesis normally, then reopen with an unreachable target.
        let mut store = open().into_store();
        store.snapshot_mut().unwrap().difficulty = 8;

        let mut cfg = config();
        cfg.max_entries_per_block = 2;
        cfg.miner.max_attempts = 1;
        let mut engine = LedgerEngine::open(store, cfg).unwrap();

        engine.add_entry("a", json!(1)).unwrap();
        engine.add_entry("b", json!(2)).unwrap();

        assert_eq!(engine.chain().len(), 1);
        assert_eq!(engine.pending_entries().len(), 2);
        assert_eq!(engine.stats().mining_failures, 1);

        // The next entry at threshold retries.
        engine.add_entry("c", json!(3)).unwrap();
        assert_eq!(engine.stats().mining_failures, 2);
        assert_eq!(engine.pending_entries().len(), 3);
    }

    #[test]
    fn test_entry_proof() {
        let mut engine = open();
        for i in 0..3 {
            engine.add_entry(format!("e{i}"), json!(i)).unwrap();
        }
        assert!(engine.entry_proof("e1").is_none());

        let block = engine.mine_pending().unwrap().unwrap();
        let (index, proof) = engine.entry_proof("e1").unwrap();
        assert_eq!(index, block.index);
        assert!(proof.verify(&block.merkle_root));
        assert_eq!(engine.find_entry("e1").unwrap().0, Some(block.index));
    }

    #[test]
    fn test_persistence_failure_is_reported() {
        let err = LedgerEngine::open(MemoryStore::failing(), config()).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(StorageError::Unavailable(_))));
    }

    #[test]
    fn test_save_failure_after_open_keeps_memory_state() {
        let mut engine = open();
        engine.add_entry("saved", json!(1)).unwrap();
        engine.store_mut().set_fail_saves(true);

        let err = engine.add_entry("unsaved", json!(2)).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(StorageError::Unavailable(_))));
        let err = engine.mint_token("gold", "alice", 5).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));

        let ids: Vec<String> = engine.pending_entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["saved", "unsaved", "mint-gold-2"]);
        assert_eq!(engine.get_token("gold").unwrap().amount, 5);
        assert_eq!(engine.store().snapshot().unwrap().pending.len(), 1);

        engine.store_mut().set_fail_saves(false);
        let next = engine.add_entry("recovered", json!(3)).unwrap();
        assert_eq!(next.previous_hash, engine.pending_entries()[2].hash);
        assert_eq!(engine.store().snapshot().unwrap().pending.len(), 4);
        assert_eq!(engine.store().snapshot().unwrap().tokens.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = LedgerConfig {
            max_entries_per_block: 0,
            ..config()
        };
        assert!(matches!(
            LedgerEngine::open(MemoryStore::new(), cfg),
            Err(LedgerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg: LedgerConfig =
            serde_json::from_str(r#"{ "max_entries_per_block": 4, "mining_mode": "background" }"#)
                .unwrap();
        assert_eq!(cfg.max_entries_per_block, 4);
        assert_eq!(cfg.mining_mode, MiningMode::Background);
        assert_eq!(cfg.miner.max_attempts, 10_000_000);
    }

    #[test]
    fn test_rebuild_token_index_matches_live_index() {
        let mut engine = open();
        engine.mint_token("gold", "alice", 10).unwrap();
        engine.transfer_token("gold", "alice", "bob", 4).unwrap();
        let live = engine.tokens.clone();

        assert_eq!(engine.rebuild_token_index().unwrap(), 2);
        assert_eq!(engine.tokens, live);
    }
}
