//! Dedicated proof-of-work thread.
//!
//! ```text
//!  LedgerEngine ──sync_channel(1)──▶ miner thread ──channel──▶ LedgerEngine
//!     submit(job)                     Miner::mine_entries        try_recv / recv
//! ```
//!
//! Only one job may be in flight. The engine applies results on its own
//! thread, so the chain is only ever appended by its owner.

use azora_consensus::{Miner, MiningOutcome};
use azora_core::{Hash, LedgerEntry};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors talking to the mining thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn mining thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("a mining job is already in flight")]
    Busy,

    #[error("mining thread has stopped")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// A frozen batch to seal into block `index`.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub previous_hash: Hash,
    pub entries: Vec<LedgerEntry>,
    pub difficulty: u32,
}

/// What the mining thread sends back.
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// Block index the job was for.
    pub index: u64,
    /// Number of pool entries the job covered.
    pub batch_len: usize,
    pub outcome: MiningOutcome,
    pub elapsed: Duration,
}

/// Handle to the mining thread.
pub struct MiningWorker {
    jobs: Option<SyncSender<MiningJob>>,
    results: Receiver<MiningResult>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl MiningWorker {
    /// Spawn the mining thread.
    pub fn spawn(miner: Miner) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::sync_channel::<MiningJob>(1);
        let (result_tx, result_rx) = mpsc::channel::<MiningResult>();

        let handle = thread::Builder::new()
            .name("azora-miner".into())
            .spawn(move || {
                for job in job_rx {
                    let started = Instant::now();
                    let batch_len = job.entries.len();
                    tracing::debug!(
                        index = job.index,
                        batch_len,
                        difficulty = job.difficulty,
                        "mining started"
                    );

                    let outcome = miner.mine_entries(
                        job.index,
                        job.previous_hash,
                        job.entries,
                        job.difficulty,
                    );
                    let result = MiningResult {
                        index: job.index,
                        batch_len,
                        outcome,
                        elapsed: started.elapsed(),
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
            in_flight: false,
        })
    }

    /// Check if a job is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Hand a job to the thread.
    pub fn submit(&mut self, job: MiningJob) -> Result<()> {
        if self.in_flight {
            return Err(WorkerError::Busy);
        }
        let jobs = self.jobs.as_ref().ok_or(WorkerError::Disconnected)?;
        jobs.send(job).map_err(|_| WorkerError::Disconnected)?;
        self.in_flight = true;
        Ok(())
    }

    /// Take the result if the job has finished.
    pub fn try_recv(&mut self) -> Result<Option<MiningResult>> {
        if !self.in_flight {
            return Ok(None);
        }
        match self.results.try_recv() {
            Ok(result) => {
                self.in_flight = false;
                Ok(Some(result))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                Err(WorkerError::Disconnected)
            }
        }
    }

    /// Wait for the in-flight job. Returns `None` if nothing is in flight.
    pub fn recv(&mut self) -> Result<Option<MiningResult>> {
        if !self.in_flight {
            return Ok(None);
        }
        let result = self.results.recv().map_err(|_| WorkerError::Disconnected);
        self.in_flight = false;
        result.map(Some)
    }
}

impl Drop for MiningWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the thread's loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for MiningWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningWorker")
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azora_consensus::MinerConfig;

    fn job(difficulty: u32) -> MiningJob {
        MiningJob {
            index: 1,
            previous_hash: Hash::ZERO,
            entries: Vec::new(),
            difficulty,
        }
    }

    #[test]
    fn test_submit_and_recv() {
        let mut worker = MiningWorker::spawn(Miner::default()).unwrap();
        assert!(worker.recv().unwrap().is_none());

        worker.submit(job(1)).unwrap();
        assert!(worker.is_busy());

        let result = worker.recv().unwrap().unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.batch_len, 0);
        assert!(result.outcome.is_sealed());
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_only_one_job_in_flight() {
        let mut worker = MiningWorker::spawn(Miner::default()).unwrap();
        worker.submit(job(1)).unwrap();
        assert!(matches!(worker.submit(job(1)), Err(WorkerError::Busy)));
        worker.recv().unwrap();
        worker.submit(job(1)).unwrap();
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let miner = Miner::new(MinerConfig {
            max_attempts: 8,
            ..MinerConfig::default()
        });
        let mut worker = MiningWorker::spawn(miner).unwrap();
        worker.submit(job(64)).unwrap();

        let result = worker.recv().unwrap().unwrap();
        assert_eq!(result.outcome, MiningOutcome::Exhausted { attempts: 8 });
    }
}
