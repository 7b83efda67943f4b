// # Remote Contact Service Trait
//
// Defines the interface to the remote contact directory.
//
// ## Implementations
//
// Provided by the embedding application (HTTP transport and authentication
// are not part of this crate). Tests use an in-memory directory.
//
// ## Usage
//
// ```rust,ignore
// use contact_sync_core::RemoteContactService;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let directory = /* RemoteContactService implementation */;
//
//     // One batch fetch per sync run
//     let contacts = directory.list().await?;
//
//     // Create a contact and keep the id the directory assigned
//     let id = directory.create(&contacts[0]).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::contact::RemoteContact;

/// Trait for remote contact directory implementations
///
/// The directory only offers coarse, whole-contact operations. It cannot be
/// relied on to keep type tags on numbers and emails, which is why the engine
/// infers them before diffing.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// ## Allowed
/// - Perform the API call for each operation
/// - Map transport failures to [`Error::Remote`](crate::Error::Remote)
/// - Enforce per-call timeouts
///
/// ## Forbidden
/// - Retry failed calls (a failed call is recorded by the engine, no retry)
/// - Cache contacts between calls (the engine fetches once per run)
/// - Access the sync record store
/// - Decide whether a contact needs updating (owned by `ContactSyncEngine`)
#[async_trait]
pub trait RemoteContactService: Send + Sync {
    /// Fetch every contact in the directory
    ///
    /// Called once per sync run. Every returned contact must carry an id.
    async fn list(&self) -> Result<Vec<RemoteContact>, crate::Error>;

    /// Create a contact and return the id assigned by the directory
    ///
    /// The `id` field of `contact` is ignored.
    async fn create(&self, contact: &RemoteContact) -> Result<String, crate::Error>;

    /// Replace the contact stored under `id`
    async fn update(&self, id: &str, contact: &RemoteContact) -> Result<(), crate::Error>;

    /// Delete the contact stored under `id`
    ///
    /// Deleting a contact that does not exist must succeed.
    async fn delete(&self, id: &str) -> Result<(), crate::Error>;

    /// Name of the directory (for logging/debugging)
    fn service_name(&self) -> &'static str {
        "remote"
    }
}
