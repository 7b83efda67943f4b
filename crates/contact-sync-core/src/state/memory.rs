// # Memory Sync Record Store
//
// In-memory implementation of SyncRecordStore.
//
// ## Crash Behavior
//
// - All sync state is lost on restart
// - The next run treats every local record as NEW and re-matches it by name,
//   so bindings are usually recovered, but every field counts as changed once
//
// ## When to Use
//
// - Testing environments
// - One-off runs where a full re-match is acceptable

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::contact::LocalId;
use crate::traits::sync_record_store::{SyncRecord, SyncRecordStore};

/// In-memory sync record store
///
/// Records live in a HashMap protected by a RwLock. Clones share the map.
#[derive(Debug, Clone, Default)]
pub struct MemorySyncRecordStore {
    inner: Arc<RwLock<HashMap<LocalId, SyncRecord>>>,
}

impl MemorySyncRecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SyncRecordStore for MemorySyncRecordStore {
    async fn get(&self, local_id: &LocalId) -> Result<Option<SyncRecord>, Error> {
        Ok(self.inner.read().await.get(local_id).cloned())
    }

    async fn put(&self, record: &SyncRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(record.local_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, local_id: &LocalId) -> Result<(), Error> {
        self.inner.write().await.remove(local_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SyncRecord>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<SyncRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        Ok(records)
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
