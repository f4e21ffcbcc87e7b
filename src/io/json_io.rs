use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::io::backend::{Backend, BackendError, Collection, Filter, Order, Record};
use crate::io::memory::{MemoryBackend, MemorySnapshot};

/// Backend that keeps every collection in memory and rewrites a single JSON
/// snapshot file after each write. A write whose snapshot cannot be saved is
/// undone in memory as well.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    inner: MemoryBackend,
}

impl JsonFileBackend {
    /// Opens the snapshot at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let snapshot = load_snapshot(&path)?;
        tracing::debug!(path = %path.display(), "opened JSON snapshot backend");
        Ok(Self {
            path,
            inner: MemoryBackend::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets the signed-in user and persists it with the snapshot.
    pub fn sign_in(&self, user_id: Option<String>) -> Result<(), BackendError> {
        let previous = self.inner.snapshot().user_id;
        self.inner.set_user(user_id);
        if let Err(err) = self.persist() {
            self.inner.set_user(previous);
            return Err(err);
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        self.inner.snapshot()
    }

    fn persist(&self) -> Result<(), BackendError> {
        save_snapshot(&self.path, &self.inner.snapshot())
    }

    fn save_changed(&self, snapshot: &MemorySnapshot, changed: usize) -> Result<(), BackendError> {
        if changed == 0 {
            return Ok(());
        }
        save_snapshot(&self.path, snapshot)
    }
}

pub fn load_snapshot(path: &Path) -> Result<MemorySnapshot, BackendError> {
    if !path.exists() {
        return Ok(MemorySnapshot::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_snapshot(path: &Path, snapshot: &MemorySnapshot) -> Result<(), BackendError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    super::atomic_write_string(path, &json)?;
    Ok(())
}

#[async_trait]
impl Backend for JsonFileBackend {
    async fn current_user(&self) -> Result<Option<String>, BackendError> {
        self.inner.current_user_now()
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Record>, BackendError> {
        self.inner.select_now(collection, filter, order)
    }

    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, BackendError> {
        self.inner
            .insert_now(collection, records, |snapshot, _| save_snapshot(&self.path, snapshot))
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Record,
    ) -> Result<usize, BackendError> {
        self.inner
            .update_now(collection, filter, patch, |snapshot, updated| {
                self.save_changed(snapshot, *updated)
            })
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<usize, BackendError> {
        self.inner.delete_now(collection, filter, |snapshot, deleted| {
            self.save_changed(snapshot, *deleted)
        })
    }
}
