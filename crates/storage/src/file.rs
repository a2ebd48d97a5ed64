//! JSON file snapshot store.

use crate::snapshot::{Result, Snapshot, SnapshotStore};
use std::fs;
use std::path::{Path, PathBuf};

/// Default snapshot file name inside a data directory.
pub const SNAPSHOT_FILE: &str = "ledger.json";

/// Stores the snapshot as pretty-printed JSON in a single file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at an explicit file path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `<dir>/ledger.json`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(SNAPSHOT_FILE))
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, encoded)?;
        fs::rename(&temp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            blocks = snapshot.chain.len(),
            pending = snapshot.pending.len(),
            "snapshot written"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
