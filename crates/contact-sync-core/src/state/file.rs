// # File Sync Record Store
//
// File-based implementation of SyncRecordStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: A document that fails to parse is treated as corrupt
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "42": {
//       "localId": "42",
//       "remoteId": "c-1f3a",
//       "hashes": { "name": 1234567890, "businessPhone": 987654321 },
//       "fieldsVersion": 1,
//       "lastSync": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::contact::LocalId;
use crate::traits::sync_record_store::{SyncRecord, SyncRecordStore};

/// Sync record file format version
const RECORD_FILE_VERSION: &str = "1.0";

/// File-based sync record store with crash recovery
///
/// Every `put`/`delete` is written through to disk before returning.
///
/// # Example
///
/// ```rust,no_run
/// use contact_sync_core::state::FileSyncRecordStore;
/// use contact_sync_core::{LocalId, SyncRecord, SyncRecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSyncRecordStore::new("/var/lib/contact-sync/records.json").await?;
///
///     let mut record = SyncRecord::new(LocalId::new("42"));
///     record.bind("c-1f3a");
///     store.put(&record).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileSyncRecordStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    records: HashMap<LocalId, SyncRecord>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RecordFileFormat {
    version: String,
    records: HashMap<LocalId, SyncRecord>,
}

impl FileSyncRecordStore {
    /// Create or load a file-backed store
    ///
    /// Loads the existing file, falling back to its backup when the file is
    /// corrupt, and to an empty store when both are unusable. Parent
    /// directories are created as needed.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create sync record directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                records,
                dirty: false,
            })),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<LocalId, SyncRecord>, Error> {
        match Self::load(path).await {
            Ok(records) => {
                tracing::debug!("Loaded {} sync records from {}", records.len(), path.display());
                Ok(records)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Sync record file {} is corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty sync state.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(records) => {
                        tracing::info!("Recovered {} sync records from backup", records.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore sync record file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(records)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with empty sync state.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<LocalId, SyncRecord>, Error> {
        if !path.exists() {
            tracing::debug!("Sync record file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read sync record file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RecordFileFormat = serde_json::from_str(&content)?;

        if file.version != RECORD_FILE_VERSION {
            tracing::warn!(
                "Sync record file version mismatch: expected {}, got {}. Attempting to load anyway.",
                RECORD_FILE_VERSION,
                file.version
            );
        }

        Ok(file.records)
    }

    /// Write all records atomically (temp file, backup, rename)
    async fn write(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;

        let file = RecordFileFormat {
            version: RECORD_FILE_VERSION.to_string(),
            records: guard.records.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create sync record backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        guard.dirty = false;
        tracing::trace!("Sync records written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SyncRecordStore for FileSyncRecordStore {
    async fn get(&self, local_id: &LocalId) -> Result<Option<SyncRecord>, Error> {
        Ok(self.state.read().await.records.get(local_id).cloned())
    }

    async fn put(&self, record: &SyncRecord) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            guard.records.insert(record.local_id.clone(), record.clone());
            guard.dirty = true;
        }
        self.write().await
    }

    async fn delete(&self, local_id: &LocalId) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            if guard.records.remove(local_id).is_none() {
                return Ok(());
            }
            guard.dirty = true;
        }
        self.write().await
    }

    async fn list(&self) -> Result<Vec<SyncRecord>, Error> {
        let guard = self.state.read().await;
        let mut records: Vec<SyncRecord> = guard.records.values().cloned().collect();
        records.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        Ok(records)
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty { self.write().await } else { Ok(()) }
    }
}
