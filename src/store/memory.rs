//! In-Memory Store
//!
//! Rows are kept in a `BTreeMap` behind a `RwLock`, so `list_all` comes back
//! ordered by identifier and many readers can list while no create is in
//! progress. Identifiers come from an atomic sequence that is only advanced
//! once a row has passed validation.

use crate::store::{NewRecord, Record, Store, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// A store that lives for as long as the process does.
///
/// # Example
///
/// ```
/// use calc_server::store::{MemoryStore, NewRecord, Store};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let id = store.create(NewRecord::new("add", 5)).await.unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(store.list_all().await.unwrap().len(), 1);
/// # });
/// ```
pub struct MemoryStore {
    rows: RwLock<BTreeMap<u64, Record>>,

    /// Last identifier handed out
    last_id: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("rows", &self.len())
            .field("last_id", &self.last_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            last_id: AtomicU64::new(0),
        }
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create(&self, record: NewRecord) -> StoreResult<u64> {
        record.validate()?;

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = record.into_record(id);

        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.insert(id, record);
        Ok(id)
    }

    async fn list_all(&self) -> StoreResult<Vec<Record>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.values().cloned().collect())
    }

    async fn get_by_id(&self, id: u64) -> StoreResult<Option<Record>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(&id).cloned())
    }

    async fn update(&self, record: Record) -> StoreResult<bool> {
        crate::store::check_label(&record.command)?;

        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(&record.id) {
            Some(existing) => {
                existing.command = record.command;
                existing.result = record.result;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.remove(&id).is_some())
    }
}
