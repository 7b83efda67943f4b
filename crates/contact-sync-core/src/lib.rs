// # contact-sync-core
//
// Core library for bidirectional contact reconciliation.
//
// ## Architecture Overview
//
// This library keeps a set of local address records consistent with a remote
// contact directory that only offers a coarse create/update/delete/list API:
// - **RemoteContactService**: Trait for the remote directory
// - **LocalContactStore**: Trait for the local persistence layer
// - **SyncRecordStore**: Trait for the per-record "last synced" snapshots
// - **ContactSyncEngine**: Drives a full sync run (fetch, match, diff, push/pull)
// - **SnapshotCache**: Cache-then-refresh holder for the full remote configuration
//
// ## Design Principles
//
// 1. **Batch runs**: One remote list per run, records processed sequentially
// 2. **Content hashing**: Change detection per field against the last synced state
// 3. **Local wins**: A genuine double-edit is resolved in favour of the local value
// 4. **Partial failure**: A failing record is recorded and skipped, never fatal

pub mod config;
pub mod contact;
pub mod convert;
pub mod engine;
pub mod error;
pub mod fields;
pub mod inference;
pub mod matcher;
pub mod normalize;
pub mod snapshot;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{SnapshotConfig, SyncConfig, SyncRecordStoreConfig};
pub use contact::{LocalContact, LocalId, PostalAddress, RemoteContact};
pub use engine::{ContactSyncEngine, SyncContext, SyncEvent};
pub use error::{Error, Result};
pub use fields::{FieldHashMap, FieldHashTracker, TrackedField};
pub use snapshot::{ConfigSnapshot, SnapshotCache};
pub use state::{FileSyncRecordStore, MemorySyncRecordStore};
pub use traits::{
    ConfigurationSource, LocalContactStore, RemoteContactService, SyncRecord, SyncRecordStore,
    SyncState,
};
