mod github;
mod memory;

pub use github::GithubStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::Result;

/// One object in a listing: its key plus the store's revision token for that
/// content (GitHub blob sha, or a content hash for the in-memory store).
/// The revision addresses the artifact content cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub revision: String,
}

/// Remote key-listing/object store used as the persistence layer.
///
/// All calls are authenticated server-side; credentials live in the store
/// implementation and never cross this boundary. Implementations must
/// tolerate concurrent calls for different keys.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// List every object under `prefix`. A prefix with no objects yields an
    /// empty listing, not an error.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Read one object's bytes. Missing keys are `Error::NotFound`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write an object, overwriting any existing content under `key`.
    async fn put(&self, key: &str, bytes: Bytes, message: &str) -> Result<()>;

    /// Delete an object. Deleting an absent key succeeds (idempotent delete),
    /// which absorbs delete/re-list races.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Create the configured store backend.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ArchiveStore>> {
    Ok(Arc::new(GithubStore::new(config.clone())))
}
