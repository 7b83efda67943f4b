//! Configuration snapshot cache
//!
//! Serves the full remote configuration (contacts plus users, devices and
//! numbers) with a cache-then-refresh pattern:
//!
//! - The first [`SnapshotCache::get`] fetches synchronously.
//! - A fresh hit is returned as is.
//! - A stale hit is returned immediately and a background refresh starts.
//!
//! At most one refresh task is in flight. A failed refresh keeps the old
//! snapshot and is only logged.
//!
//! Staleness is tracked by generation: [`SnapshotCache::invalidate`] bumps the
//! requested generation, and a fetch only satisfies the generation that was
//! current when it started. An invalidation that arrives while a fetch is in
//! flight keeps the cache stale after that fetch lands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SnapshotConfig;
use crate::contact::RemoteContact;
use crate::error::Result;
use crate::traits::ConfigurationSource;

/// Full configuration of the remote account at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub contacts: Vec<RemoteContact>,
    /// Users, devices and numbers as delivered by the remote side
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ConfigSnapshot {
    /// Snapshot taken now
    pub fn new(contacts: Vec<RemoteContact>, payload: serde_json::Value) -> Self {
        Self {
            fetched_at: Utc::now(),
            contacts,
            payload,
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.fetched_at)
    }

    pub fn is_stale(&self, ttl: chrono::Duration) -> bool {
        self.age() > ttl
    }
}

/// Cache-then-refresh holder for [`ConfigSnapshot`]
pub struct SnapshotCache {
    source: Arc<dyn ConfigurationSource>,
    ttl: chrono::Duration,
    current: Arc<RwLock<Option<Arc<ConfigSnapshot>>>>,
    /// Bumped by every invalidation
    requested: Arc<AtomicU64>,
    /// Generation the cached snapshot was fetched for
    served: Arc<AtomicU64>,
    /// Single slot for the in-flight refresh task
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn ConfigurationSource>, config: &SnapshotConfig) -> Self {
        Self {
            source,
            ttl: config.ttl(),
            current: Arc::new(RwLock::new(None)),
            requested: Arc::new(AtomicU64::new(0)),
            served: Arc::new(AtomicU64::new(0)),
            refresh: Mutex::new(None),
        }
    }

    /// Current snapshot and whether it is stale
    ///
    /// With nothing cached yet the snapshot is fetched before returning, and
    /// a fetch error is returned. A stale snapshot triggers
    /// [`refresh_async`](Self::refresh_async).
    pub async fn get(&self) -> Result<(Arc<ConfigSnapshot>, bool)> {
        let cached = self.current.read().await.clone();

        let Some(snapshot) = cached else {
            debug!("No configuration snapshot cached, fetching");
            let generation = self.requested.load(Ordering::SeqCst);
            let snapshot = Arc::new(self.source.fetch_snapshot().await?);
            *self.current.write().await = Some(Arc::clone(&snapshot));
            self.served.fetch_max(generation, Ordering::SeqCst);
            let stale = self.is_invalidated();
            return Ok((snapshot, stale));
        };

        let stale = self.is_invalidated() || snapshot.is_stale(self.ttl);
        if stale {
            debug!(
                "Serving stale configuration snapshot ({}s old)",
                snapshot.age().num_seconds()
            );
            self.refresh_async().await;
        }

        Ok((snapshot, stale))
    }

    /// Start a background refresh
    ///
    /// Returns `false` without doing anything when a refresh is already in
    /// flight.
    pub async fn refresh_async(&self) -> bool {
        let mut slot = self.refresh.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Configuration snapshot refresh already in flight");
            return false;
        }

        let source = Arc::clone(&self.source);
        let current = Arc::clone(&self.current);
        let served = Arc::clone(&self.served);
        let generation = self.requested.load(Ordering::SeqCst);

        *slot = Some(tokio::spawn(async move {
            match source.fetch_snapshot().await {
                Ok(snapshot) => {
                    info!(
                        "Configuration snapshot refreshed ({} contacts)",
                        snapshot.contacts.len()
                    );
                    *current.write().await = Some(Arc::new(snapshot));
                    served.fetch_max(generation, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Configuration snapshot refresh failed, keeping old snapshot: {}", e);
                }
            }
        }));

        true
    }

    /// Wait until the in-flight refresh, if any, has finished
    pub async fn wait_for_refresh(&self) {
        let handle = self.refresh.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("Configuration snapshot refresh task failed: {}", e);
        }
    }

    /// Mark the cached snapshot stale
    ///
    /// Only a fetch started after this call clears the mark.
    pub fn invalidate(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
    }

    fn is_invalidated(&self) -> bool {
        self.requested.load(Ordering::SeqCst) > self.served.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("ttl", &self.ttl)
            .field("invalidated", &self.is_invalidated())
            .finish_non_exhaustive()
    }
}
