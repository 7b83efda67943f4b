// # Sync Record Store Implementations
//
// This module provides implementations of the SyncRecordStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileSyncRecordStore;
pub use memory::MemorySyncRecordStore;

use crate::config::SyncRecordStoreConfig;
use crate::error::Result;
use crate::traits::SyncRecordStore;

/// Build the sync record store named by the configuration
pub async fn open_store(config: &SyncRecordStoreConfig) -> Result<Box<dyn SyncRecordStore>> {
    match config {
        SyncRecordStoreConfig::Memory => Ok(Box::new(MemorySyncRecordStore::new())),
        SyncRecordStoreConfig::File { path } => Ok(Box::new(FileSyncRecordStore::new(path).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::LocalId;
    use crate::traits::SyncRecord;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&SyncRecordStoreConfig::Memory).await.unwrap();
        store.put(&SyncRecord::new(LocalId::new("1"))).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_file_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let config = SyncRecordStoreConfig::File {
            path: path.to_string_lossy().into_owned(),
        };

        let store = open_store(&config).await.unwrap();
        let mut record = SyncRecord::new(LocalId::new("1"));
        record.bind("r-1");
        store.put(&record).await.unwrap();
        assert!(path.exists());

        let reopened = open_store(&config).await.unwrap();
        let loaded = reopened.get(&LocalId::new("1")).await.unwrap().unwrap();
        assert_eq!(loaded.remote_id.as_deref(), Some("r-1"));
    }
}
