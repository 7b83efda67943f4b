// # Local Contact Store Trait
//
// Defines the interface to the local persistence layer that owns the address
// records. The engine only reads records eligible for sync and writes back
// the fields it pulled from the remote directory.

use async_trait::async_trait;

use crate::contact::LocalContact;

/// Trait for local address record persistence
///
/// Access control is the caller's concern: the store returns whatever records
/// are eligible for sync.
#[async_trait]
pub trait LocalContactStore: Send + Sync {
    /// All local records eligible for sync, in a stable order
    async fn list_syncable(&self) -> Result<Vec<LocalContact>, crate::Error>;

    /// Persist a record whose synchronized fields were updated from remote
    async fn save(&self, contact: &LocalContact) -> Result<(), crate::Error>;
}
