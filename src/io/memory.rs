use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::io::backend::{Backend, BackendError, Collection, Filter, Order, Record};

/// Full contents of every collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub collections: BTreeMap<Collection, Vec<Record>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: MemorySnapshot,
    failing_writes: BTreeMap<Collection, usize>,
    delayed_failures: BTreeMap<Collection, usize>,
    offline: bool,
}

/// In-process backend. Generates ids and timestamps, cascades deletes, and
/// can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.set_user(Some(user_id.into()));
        backend
    }

    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot,
                ..MemoryState::default()
            }),
        }
    }

    pub fn set_user(&self, user_id: Option<String>) {
        self.lock().snapshot.user_id = user_id;
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Makes the next write (insert, update or delete) on `collection` fail.
    pub fn fail_next_write(&self, collection: Collection) {
        *self.lock().failing_writes.entry(collection).or_insert(0) += 1;
    }

    /// Lets `successes` writes on `collection` through, then fails the next one.
    pub fn fail_write_after(&self, collection: Collection, successes: usize) {
        self.lock().delayed_failures.insert(collection, successes);
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        self.lock().snapshot.clone()
    }

    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.lock()
            .snapshot
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.lock()
            .snapshot
            .collections
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub(crate) fn current_user_now(&self) -> Result<Option<String>, BackendError> {
        let state = self.lock();
        check_online(&state)?;
        Ok(state.snapshot.user_id.clone())
    }

    pub(crate) fn select_now(
        &self,
        collection: Collection,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Record>, BackendError> {
        let state = self.lock();
        check_online(&state)?;
        let mut found: Vec<Record> = state
            .snapshot
            .collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = order {
            // Descending ties come back newest first.
            if !order.is_ascending() {
                found.reverse();
            }
            found.sort_by(|a, b| order.compare(a, b));
        }
        Ok(found)
    }

    pub(crate) fn insert_now(
        &self,
        collection: Collection,
        records: Vec<Record>,
        commit: impl FnOnce(&MemorySnapshot, &Vec<Record>) -> Result<(), BackendError>,
    ) -> Result<Vec<Record>, BackendError> {
        self.write(
            collection,
            |snapshot| insert_records(snapshot, collection, records),
            commit,
        )
    }

    pub(crate) fn update_now(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Record,
        commit: impl FnOnce(&MemorySnapshot, &usize) -> Result<(), BackendError>,
    ) -> Result<usize, BackendError> {
        self.write(
            collection,
            |snapshot| Ok(update_records(snapshot, collection, filter, &patch)),
            commit,
        )
    }

    pub(crate) fn delete_now(
        &self,
        collection: Collection,
        filter: &Filter,
        commit: impl FnOnce(&MemorySnapshot, &usize) -> Result<(), BackendError>,
    ) -> Result<usize, BackendError> {
        self.write(
            collection,
            |snapshot| Ok(delete_cascading(snapshot, collection, filter)),
            commit,
        )
    }

    /// Applies a write and hands the resulting snapshot to `commit` while the
    /// lock is held. A failed commit puts the previous snapshot back.
    fn write<T>(
        &self,
        collection: Collection,
        apply: impl FnOnce(&mut MemorySnapshot) -> Result<T, BackendError>,
        commit: impl FnOnce(&MemorySnapshot, &T) -> Result<(), BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = self.lock();
        check_write(&mut state, collection)?;

        let previous = state.snapshot.clone();
        let written = apply(&mut state.snapshot)
            .and_then(|value| commit(&state.snapshot, &value).map(|()| value));
        if written.is_err() {
            state.snapshot = previous;
        }
        written
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn current_user(&self) -> Result<Option<String>, BackendError> {
        self.current_user_now()
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Record>, BackendError> {
        self.select_now(collection, filter, order)
    }

    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, BackendError> {
        self.insert_now(collection, records, |_, _| Ok(()))
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Record,
    ) -> Result<usize, BackendError> {
        self.update_now(collection, filter, patch, |_, _| Ok(()))
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<usize, BackendError> {
        self.delete_now(collection, filter, |_, _| Ok(()))
    }
}

fn check_online(state: &MemoryState) -> Result<(), BackendError> {
    if state.offline {
        return Err(BackendError::Unavailable("backend is offline".to_string()));
    }
    Ok(())
}

fn check_write(state: &mut MemoryState, collection: Collection) -> Result<(), BackendError> {
    check_online(state)?;
    if let Some(remaining) = state.failing_writes.get_mut(&collection) {
        if *remaining > 0 {
            *remaining -= 1;
            return Err(rejected(collection));
        }
    }
    if let Some(remaining) = state.delayed_failures.get_mut(&collection) {
        if *remaining == 0 {
            state.delayed_failures.remove(&collection);
            return Err(rejected(collection));
        }
        *remaining -= 1;
    }
    Ok(())
}

fn rejected(collection: Collection) -> BackendError {
    BackendError::Rejected {
        collection,
        message: "write rejected".to_string(),
    }
}

fn insert_records(
    snapshot: &mut MemorySnapshot,
    collection: Collection,
    records: Vec<Record>,
) -> Result<Vec<Record>, BackendError> {
    let now = timestamp();
    let stored = snapshot.collections.entry(collection).or_default();
    let mut inserted = Vec::with_capacity(records.len());
    for mut record in records {
        let needs_id = match record.get("id") {
            Some(Value::String(id)) => id.is_empty(),
            _ => true,
        };
        if needs_id {
            record.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let id = record.get("id").cloned();
        if stored
            .iter()
            .chain(inserted.iter())
            .any(|existing: &Record| existing.get("id") == id.as_ref())
        {
            return Err(BackendError::Rejected {
                collection,
                message: format!("duplicate key {}", id.unwrap_or(Value::Null)),
            });
        }
        record
            .entry("created_at")
            .or_insert_with(|| Value::String(now.clone()));
        if collection == Collection::Pages {
            record
                .entry("updated_at")
                .or_insert_with(|| Value::String(now.clone()));
        }
        inserted.push(record);
    }
    stored.extend(inserted.iter().cloned());
    Ok(inserted)
}

fn update_records(
    snapshot: &mut MemorySnapshot,
    collection: Collection,
    filter: &Filter,
    patch: &Record,
) -> usize {
    let now = timestamp();
    let mut updated = 0;
    if let Some(records) = snapshot.collections.get_mut(&collection) {
        for record in records.iter_mut().filter(|record| filter.matches(record)) {
            for (field, value) in patch {
                record.insert(field.clone(), value.clone());
            }
            if record.contains_key("updated_at") && !patch.contains_key("updated_at") {
                record.insert("updated_at".to_string(), Value::String(now.clone()));
            }
            updated += 1;
        }
    }
    updated
}

fn children(collection: Collection) -> &'static [(Collection, &'static str)] {
    match collection {
        Collection::Tables => &[
            (Collection::Columns, "table_id"),
            (Collection::Rows, "table_id"),
        ],
        Collection::Columns => &[(Collection::Cells, "column_id")],
        Collection::Rows => &[(Collection::Cells, "row_id")],
        Collection::Cells | Collection::Pages => &[],
    }
}

fn delete_cascading(snapshot: &mut MemorySnapshot, collection: Collection, filter: &Filter) -> usize {
    let Some(records) = snapshot.collections.get_mut(&collection) else {
        return 0;
    };

    let mut removed_ids = Vec::new();
    records.retain(|record| {
        if filter.matches(record) {
            removed_ids.push(record.get("id").cloned().unwrap_or(Value::Null));
            false
        } else {
            true
        }
    });

    let removed = removed_ids.len();
    if removed > 0 {
        for (child, foreign_key) in children(collection) {
            let child_filter = Filter::new().is_in(foreign_key, removed_ids.iter().cloned());
            delete_cascading(snapshot, *child, &child_filter);
        }
    }
    removed
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
