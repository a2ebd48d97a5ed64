//! sled snapshot store.

use crate::snapshot::{Result, Snapshot, SnapshotStore, StorageError};
use sled::Db;
use std::path::{Path, PathBuf};

/// Key holding the JSON-encoded snapshot.
const SNAPSHOT_KEY: &[u8] = b"ledger:snapshot";
/// Key holding the block count of the stored snapshot.
const HEIGHT_KEY: &[u8] = b"ledger:height";

/// Snapshot store backed by an embedded sled database.
///
/// The snapshot and its height are written in one batch. Values are JSON
/// because entry payloads are free-form JSON.
pub struct SledStore {
    db: Db,
    path: Option<PathBuf>,
}

impl SledStore {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        Ok(Self {
            db,
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db, path: None })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = serde_json::to_vec(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Block count of the stored snapshot, without decoding it.
    pub fn stored_height(&self) -> Result<Option<u64>> {
        self.get(HEIGHT_KEY)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the underlying sled database.
    pub fn inner(&self) -> &Db {
        &self.db
    }
}

impl SnapshotStore for SledStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let snapshot: Option<Snapshot> = self.get(SNAPSHOT_KEY)?;
        if let (Some(snapshot), Some(height)) = (&snapshot, self.stored_height()?) {
            if snapshot.chain.len() as u64 != height {
                return Err(StorageError::Corrupt(format!(
                    "snapshot holds {} blocks, height key says {}",
                    snapshot.chain.len(),
                    height
                )));
            }
        }
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.insert(SNAPSHOT_KEY, serde_json::to_vec(snapshot)?);
        batch.insert(HEIGHT_KEY, serde_json::to_vec(&(snapshot.chain.len() as u64))?);
        self.db.apply_batch(batch)?;
        self.flush()?;

        tracing::debug!(
            blocks = snapshot.chain.len(),
            pending = snapshot.pending.len(),
            "snapshot written to sled"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sled:{}", path.display()),
            None => "sled:<temporary>".to_string(),
        }
    }
}
