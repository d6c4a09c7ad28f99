//! In-memory store for tests and local development.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{ArchiveStore, ObjectInfo};
use crate::error::{Error, Result};

/// `BTreeMap`-backed store with content-hash revisions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every key currently stored, for assertions in tests.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ArchiveStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| ObjectInfo {
                key: key.clone(),
                revision: format!("{:x}", md5::compute(bytes)),
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Bytes, _message: &str) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // NotFound on delete is success.
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("u1/a_1.pdf", Bytes::from_static(b"one"), "m").await.unwrap();
        store.put("u1/a_1.pdf", Bytes::from_static(b"two"), "m").await.unwrap();
        assert_eq!(store.get("u1/a_1.pdf").await.unwrap(), Bytes::from_static(b"two"));
        assert_eq!(store.keys().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_respects_prefix() {
        let store = MemoryStore::new();
        store.put("u1/a_1.pdf", Bytes::from_static(b"x"), "m").await.unwrap();
        store.put("u2/b_2.pdf", Bytes::from_static(b"y"), "m").await.unwrap();
        let listing = store.list("u1/").await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].key, "u1/a_1.pdf");
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("u1/missing_1.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_revision_tracks_content() {
        let store = MemoryStore::new();
        store.put("u1/a_1.md", Bytes::from_static(b"one"), "m").await.unwrap();
        let first = store.list("u1/").await.unwrap()[0].revision.clone();
        store.put("u1/a_1.md", Bytes::from_static(b"two"), "m").await.unwrap();
        let second = store.list("u1/").await.unwrap()[0].revision.clone();
        assert_ne!(first, second);
    }
}
