//! Contract Test: Configuration Snapshot Refresh
//!
//! This test verifies how the engine cooperates with the snapshot cache.
//!
//! Constraints verified:
//! - A run that wrote to the remote directory refreshes the cache
//! - A run that changed nothing leaves the cache alone
//!
//! If this test fails, readers may be served outdated configuration.

mod common;

use common::*;
use contact_sync_core::{ContactSyncEngine, MemorySyncRecordStore, SnapshotCache, SnapshotConfig};
use std::sync::Arc;
use tokio_test::assert_ok;

#[tokio::test]
async fn remote_changes_trigger_one_refresh() {
    let source = Arc::new(CountingSource::new());
    let cache = Arc::new(SnapshotCache::new(source.clone(), &SnapshotConfig::default()));

    let (snapshot, stale) = assert_ok!(cache.get().await);
    assert!(!stale);
    assert_eq!(snapshot.payload["generation"], 1);

    let remote = MockRemoteService::new();
    let local = MockLocalStore::new(vec![jane()]);
    let (engine, _events) = ContactSyncEngine::new(
        Box::new(MockRemoteService::sharing_state_with(&remote)),
        Box::new(MockLocalStore::sharing_state_with(&local)),
        Box::new(MemorySyncRecordStore::new()),
        minimal_config(),
    )
    .expect("engine construction succeeds");
    let engine = engine.with_snapshot_cache(Arc::clone(&cache));
    assert!(engine.snapshot_cache().is_some());

    let ctx = assert_ok!(engine.sync(false).await);
    assert_eq!(ctx.remote_created, 1);

    cache.wait_for_refresh().await;
    assert_eq!(source.fetch_call_count(), 2);
    let (snapshot, stale) = assert_ok!(cache.get().await);
    assert!(!stale);
    assert_eq!(snapshot.payload["generation"], 2);

    // Nothing written, nothing refreshed
    let ctx = assert_ok!(engine.sync(false).await);
    assert!(ctx.is_noop());
    cache.wait_for_refresh().await;
    assert_eq!(source.fetch_call_count(), 2);
}
