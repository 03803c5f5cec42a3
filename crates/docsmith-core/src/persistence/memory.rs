//! In-process snapshot store for tests and ephemeral sessions

use super::{Snapshot, SnapshotKey, SnapshotStore};
use crate::error::CoreError;
use crate::session::UserId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<SnapshotKey, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a raw value, bypassing encoding (used to simulate corruption)
    pub fn put_raw(&self, key: &SnapshotKey, value: impl Into<String>) {
        self.entries.lock().insert(key.clone(), value.into());
    }

    pub fn raw(&self, key: &SnapshotKey) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &SnapshotKey) -> Result<Option<String>, CoreError> {
        Ok(self.raw(key))
    }

    fn save_batch(&self, snapshots: &[Snapshot]) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        for snapshot in snapshots {
            entries.insert(snapshot.key.clone(), snapshot.value.clone());
        }
        Ok(())
    }

    fn remove_user(&self, user: &UserId) -> Result<usize, CoreError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| key.user != *user);
        Ok(before - entries.len())
    }
}
