//! Contract Test: Partial Failure & Run Exclusion
//!
//! This test verifies that no per-record failure aborts a run.
//!
//! Constraints verified:
//! - A failing create is recorded and the remaining records still sync
//! - The failed record is retried on the next run (no automatic retry)
//! - Failing batch fetches still return a SyncContext
//! - A second run on the same engine is rejected while one is active
//!
//! If this test fails, error isolation is broken.

mod common;

use common::*;
use contact_sync_core::engine::IssueKind;
use contact_sync_core::{
    ContactSyncEngine, Error, LocalId, MemorySyncRecordStore, SyncEvent, SyncRecordStore,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn failing_record_does_not_abort_the_run() {
    let remote = MockRemoteService::new();
    remote.fail_create_for("Jane Doe");
    let local = MockLocalStore::new(vec![jane(), john()]);
    let records = MemorySyncRecordStore::new();
    let (engine, mut events) = ContactSyncEngine::new(
        Box::new(MockRemoteService::sharing_state_with(&remote)),
        Box::new(MockLocalStore::sharing_state_with(&local)),
        Box::new(records.clone()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let ctx = assert_ok!(engine.sync(false).await);

    assert_eq!(ctx.local_processed, 2);
    assert_eq!(ctx.remote_created, 1);
    assert_eq!(ctx.skipped, 1);
    assert!(ctx.has_errors());
    let issue = ctx.issues_of(IssueKind::TransientNetwork).next().unwrap();
    assert_eq!(issue.local_id, Some(LocalId::new("1")));
    assert!(records.get(&LocalId::new("1")).await.unwrap().is_none());

    let events = drain_events(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::RecordFailed { local_id, kind: IssueKind::TransientNetwork, .. }
            if local_id.as_str() == "1"
    )));

    remote.clear_failures();
    let retried = assert_ok!(engine.sync(false).await);
    assert_eq!(retried.remote_created, 1);
    assert!(!retried.has_errors());
    assert_eq!(remote.contacts().len(), 2);
}

#[tokio::test]
async fn failing_remote_list_returns_context() {
    let remote = MockRemoteService::new();
    remote.fail_list();
    let local = MockLocalStore::new(vec![jane()]);
    let (engine, _events) = ContactSyncEngine::new(
        Box::new(MockRemoteService::sharing_state_with(&remote)),
        Box::new(MockLocalStore::sharing_state_with(&local)),
        Box::new(MemorySyncRecordStore::new()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let ctx = assert_ok!(engine.sync(false).await);

    assert!(ctx.has_errors());
    assert_eq!(ctx.local_processed, 0);
    assert_eq!(remote.create_call_count(), 0);
    assert_eq!(ctx.issues[0].kind, IssueKind::TransientNetwork);
    assert_eq!(ctx.issues[0].local_id, None);
}

#[tokio::test]
async fn failing_local_list_returns_context() {
    let remote = MockRemoteService::new();
    let local = MockLocalStore::new(vec![jane()]);
    local.fail_list();
    let (engine, _events) = ContactSyncEngine::new(
        Box::new(MockRemoteService::sharing_state_with(&remote)),
        Box::new(MockLocalStore::sharing_state_with(&local)),
        Box::new(MemorySyncRecordStore::new()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let ctx = assert_ok!(engine.sync(false).await);
    assert_eq!(ctx.issues_of(IssueKind::Store).count(), 1);
    assert!(ctx.finished_at.is_some());
}

#[tokio::test]
async fn overlapping_run_is_rejected() {
    let (remote, gate) = MockRemoteService::new().with_list_gate();
    let local = MockLocalStore::new(vec![jane()]);
    let (engine, _events) = ContactSyncEngine::new(
        Box::new(MockRemoteService::sharing_state_with(&remote)),
        Box::new(MockLocalStore::sharing_state_with(&local)),
        Box::new(MemorySyncRecordStore::new()),
        minimal_config(),
    )
    .expect("engine construction succeeds");
    let engine = Arc::new(engine);

    let running = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.sync(false).await })
    };

    // Wait until the first run is blocked inside list()
    while remote.list_call_count() == 0 {
        tokio::task::yield_now().await;
    }

    let rejected = assert_err!(engine.sync(false).await);
    assert!(matches!(rejected, Error::SyncInProgress));

    gate.add_permits(1);
    let ctx = assert_ok!(running.await.unwrap());
    assert_eq!(ctx.remote_created, 1);

    // The lock is released once the run is over
    gate.add_permits(1);
    assert_ok!(engine.sync(false).await);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = minimal_config();
    config.country_hint = Some("+49".to_string());

    let result = ContactSyncEngine::new(
        Box::new(MockRemoteService::new()),
        Box::new(MockLocalStore::new(Vec::new())),
        Box::new(MemorySyncRecordStore::new()),
        config,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
