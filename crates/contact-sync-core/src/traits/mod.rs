//! Core traits for contact reconciliation
//!
//! This module defines the abstract interfaces the engine is driven through.
//!
//! - [`RemoteContactService`]: List/create/update/delete on the remote directory
//! - [`LocalContactStore`]: Read and persist local address records
//! - [`SyncRecordStore`]: Persistent "last synced" snapshots for idempotency
//! - [`ConfigurationSource`]: Fetch the full remote configuration snapshot

pub mod configuration_source;
pub mod local_store;
pub mod remote_service;
pub mod sync_record_store;

pub use configuration_source::ConfigurationSource;
pub use local_store::LocalContactStore;
pub use remote_service::RemoteContactService;
pub use sync_record_store::{SyncRecord, SyncRecordStore, SyncState};
