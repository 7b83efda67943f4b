// # Configuration Source Trait
//
// Defines where a full configuration snapshot of the remote account comes
// from. The snapshot is a superset of the contact list (users, devices,
// numbers) and is served through [`SnapshotCache`](crate::SnapshotCache).

use async_trait::async_trait;

use crate::snapshot::ConfigSnapshot;

/// Trait for fetching the full remote configuration
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Fetch a fresh snapshot
    ///
    /// May be slow; the cache calls it from a background task.
    async fn fetch_snapshot(&self) -> Result<ConfigSnapshot, crate::Error>;
}
