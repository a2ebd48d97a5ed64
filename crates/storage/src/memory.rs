//! In-memory snapshot store.

use crate::snapshot::{Result, Snapshot, SnapshotStore, StorageError};

/// Keeps the last saved snapshot in memory.
///
/// Used by tests and by callers that do not need durability. A store built
/// with [`MemoryStore::failing`], or switched with
/// [`MemoryStore::set_fail_saves`], rejects every save.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<Snapshot>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Self::default()
        }
    }

    /// Store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Start or stop rejecting saves. The last good snapshot is kept.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// The stored snapshot.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Mutable access to the stored snapshot.
    pub fn snapshot_mut(&mut self) -> Option<&mut Snapshot> {
        self.snapshot.as_mut()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves {
            return Err(StorageError::Unavailable("memory store rejects saves".into()));
        }
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            chain: Vec::new(),
            tokens: Vec::new(),
            difficulty: 1,
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&empty_snapshot()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap(), Some(empty_snapshot()));
    }

    #[test]
    fn test_failing_store() {
        let mut store = MemoryStore::failing();
        assert!(matches!(
            store.save(&empty_snapshot()),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_saves_fail_after_switch() {
        let mut store = MemoryStore::new();
        store.save(&empty_snapshot()).unwrap();

        store.set_fail_saves(true);
        let mut changed = empty_snapshot();
        changed.difficulty = 7;
        assert!(store.save(&changed).is_err());
        assert_eq!(store.load().unwrap(), Some(empty_snapshot()));

        store.set_fail_saves(false);
        store.save(&changed).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
