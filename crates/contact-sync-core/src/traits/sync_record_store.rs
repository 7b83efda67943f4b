// # Sync Record Store Trait
//
// Defines the interface for persistent per-record sync state.
//
// ## Purpose
//
// The sync record store makes runs idempotent and resumable by tracking, for
// each local record:
// - The remote contact it is bound to
// - A content hash of every tracked field as of the last successful sync
// - The time of the last successful sync
//
// ## Implementations
//
// - In-memory: `MemorySyncRecordStore`
// - File-based: `FileSyncRecordStore` (JSON, write-then-rename)
//
// ## Usage
//
// ```rust,ignore
// use contact_sync_core::{LocalId, SyncRecord, SyncRecordStore};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* SyncRecordStore implementation */;
//
//     let id = LocalId::new("42");
//     let mut record = store.get(&id).await?.unwrap_or_else(|| SyncRecord::new(id));
//     record.bind("remote-7");
//     store.put(&record).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::contact::LocalId;
use crate::fields::{FieldHashMap, TRACKED_FIELDS_VERSION, TrackedField};

/// Lifecycle state of a sync record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Not yet bound to a remote contact
    New,
    /// Bound to a remote contact id
    Bound,
}

/// Sync state of one local record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// The local record this state belongs to
    pub local_id: LocalId,
    /// Bound remote contact, `None` while the record is new
    pub remote_id: Option<String>,
    /// Field hashes as of the last successful sync
    ///
    /// Keys outside the current tracked field set are dropped on load.
    #[serde(default, deserialize_with = "known_fields_only")]
    pub hashes: FieldHashMap,
    /// Tracked field set version the hashes were written with
    #[serde(default = "default_fields_version")]
    pub fields_version: u32,
    /// Timestamp of the last successful sync
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncRecord {
    /// Create a record in state [`SyncState::New`]
    pub fn new(local_id: LocalId) -> Self {
        Self {
            local_id,
            remote_id: None,
            hashes: FieldHashMap::new(),
            fields_version: TRACKED_FIELDS_VERSION,
            last_sync: None,
        }
    }

    pub fn state(&self) -> SyncState {
        if self.remote_id.is_some() {
            SyncState::Bound
        } else {
            SyncState::New
        }
    }

    pub fn is_bound(&self) -> bool {
        self.state() == SyncState::Bound
    }

    /// Bind to a remote contact (NEW -> BOUND)
    pub fn bind(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    /// Clear the binding and all hashes (BOUND -> NEW)
    pub fn reset(&mut self) {
        self.remote_id = None;
        self.hashes.clear();
    }

    /// Store the snapshot taken at the end of a successful sync
    pub fn mark_synced(&mut self, hashes: FieldHashMap) {
        self.hashes = hashes;
        self.fields_version = TRACKED_FIELDS_VERSION;
        self.last_sync = Some(Utc::now());
    }

    /// Previously stored hash of a field, if it was ever observed
    pub fn hash_of(&self, field: TrackedField) -> Option<u64> {
        self.hashes.get(&field).copied()
    }

    /// Check if the last sync is older than the given duration
    pub fn is_stale(&self, max_age: chrono::Duration) -> bool {
        match self.last_sync {
            Some(at) => Utc::now().signed_duration_since(at) > max_age,
            None => true,
        }
    }
}

fn default_fields_version() -> u32 {
    TRACKED_FIELDS_VERSION
}

fn known_fields_only<'de, D>(deserializer: D) -> Result<FieldHashMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, hash)| match key.parse::<TrackedField>() {
            Ok(field) => Some((field, hash)),
            Err(_) => {
                tracing::debug!("Dropping unknown tracked field '{}' from sync record", key);
                None
            }
        })
        .collect())
}

/// Trait for sync record store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Responsibilities
///
/// ## Allowed
/// - Perform I/O for persistent storage
/// - Cache records in memory (with explicit flush)
///
/// ## Forbidden
/// - Decide when a record changes state (owned by `ContactSyncEngine`)
/// - Talk to the remote directory
#[async_trait]
pub trait SyncRecordStore: Send + Sync {
    /// Get the sync record of a local record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SyncRecord))`: The stored record
    /// - `Ok(None)`: The local record was never synced
    /// - `Err(Error)`: Storage error
    async fn get(&self, local_id: &LocalId) -> Result<Option<SyncRecord>, crate::Error>;

    /// Create or replace a sync record
    async fn put(&self, record: &SyncRecord) -> Result<(), crate::Error>;

    /// Delete a sync record (succeeds if it didn't exist)
    async fn delete(&self, local_id: &LocalId) -> Result<(), crate::Error>;

    /// List all stored records
    async fn list(&self) -> Result<Vec<SyncRecord>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
