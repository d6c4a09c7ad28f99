//! Artifact content cache: a memory layer over an on-disk layer.
//!
//! Addressed by `(artifact key, store revision)`, so cached content can never
//! go stale: overwriting an artifact in the store changes its revision and
//! the old cache entry simply stops being asked for. On disk, each artifact
//! key owns a single slot whose record carries the revision it was cached at;
//! rewriting an artifact reclaims the slot instead of leaving the previous
//! revision behind.

mod key;

pub use key::CacheKey;

use bytes::Bytes;
use moka::future::Cache;
use sled::Db;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Default on-disk cache location, following XDG conventions.
fn default_cache_path() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("paper-archive")
}

/// Clear the on-disk artifact cache at its default location.
///
/// Runs before the cache is opened (the web binary's `--clear-cache` flag).
/// Returns the number of entries removed.
pub fn clear_artifact_cache() -> Result<usize> {
    let path = default_cache_path();
    if !path.exists() {
        return Ok(0);
    }

    let db = open_disk(&path)?;
    let count = db.len();
    db.clear().map_err(|e| Error::CacheWrite(e.to_string()))?;
    db.flush()
        .map_err(|e| Error::CacheWrite(format!("flush failed: {e}")))?;
    Ok(count)
}

fn open_disk(path: &Path) -> Result<Db> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::CacheInit(format!(
                "failed to create cache directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    sled::open(path).map_err(|e| {
        let reason = e.to_string();
        if reason.contains("WouldBlock") || reason.contains("lock") {
            Error::CacheInit(format!(
                "artifact cache at {} is locked: another paper-archive process \
                 holds it, or a crashed one left its LOCK file behind",
                path.display()
            ))
        } else {
            Error::CacheInit(format!(
                "failed to open artifact cache at {}: {e}",
                path.display()
            ))
        }
    })
}

/// Combined artifact content cache.
///
/// Artifacts range from a few kilobytes of markdown to multi-megabyte PDFs,
/// so the memory layer weighs entries by byte size rather than count. The
/// disk layer survives restarts so a reopened document does not re-download
/// from the remote store.
pub struct ArtifactCache {
    memory: Option<Cache<CacheKey, Bytes>>,
    disk: Option<Db>,
}

impl ArtifactCache {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = config.memory_enabled.then(|| {
            let mut builder = Cache::builder()
                .max_capacity(config.memory_max_mb.saturating_mul(1024 * 1024))
                .weigher(|_key: &CacheKey, bytes: &Bytes| -> u32 {
                    bytes.len().try_into().unwrap_or(u32::MAX)
                });
            if config.memory_ttl_seconds > 0 {
                builder = builder.time_to_live(Duration::from_secs(config.memory_ttl_seconds));
            }
            builder.build()
        });

        let disk = if config.disk_enabled {
            let path = config.disk_path.clone().unwrap_or_else(default_cache_path);
            let db = open_disk(&path)?;
            debug!("Opened disk cache at {}", path.display());
            Some(db)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Get cached artifact bytes, populating the memory layer on a disk hit.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        if let Some(memory) = &self.memory
            && let Some(bytes) = memory.get(key).await
        {
            return Some(bytes);
        }

        if let Some(bytes) = self.disk_get(key) {
            if let Some(memory) = &self.memory {
                memory.insert(key.clone(), bytes.clone()).await;
            }
            return Some(bytes);
        }

        None
    }

    /// Cache one artifact's bytes under its `(key, revision)` address.
    ///
    /// A disk write failure degrades to memory-only caching; the artifact is
    /// already in hand, so losing persistence is not worth failing the fetch.
    pub async fn insert(&self, key: &CacheKey, bytes: Bytes) {
        if let Some(memory) = &self.memory {
            memory.insert(key.clone(), bytes.clone()).await;
        }

        if let Some(disk) = &self.disk {
            let record = encode_record(key.revision(), &bytes);
            let outcome = disk
                .insert(key.artifact_key(), record)
                .and_then(|_| disk.flush());
            if let Err(e) = outcome {
                warn!("Disk cache write failed for {}: {}", key, e);
            }
        }
    }

    /// Drop every entry from both layers.
    pub fn clear(&self) {
        if let Some(memory) = &self.memory {
            memory.invalidate_all();
        }

        if let Some(disk) = &self.disk {
            let outcome = disk.clear().and_then(|()| disk.flush().map(|_| ()));
            if let Err(e) = outcome {
                warn!("Disk cache clear failed: {}", e);
            }
        }
    }

    fn disk_get(&self, key: &CacheKey) -> Option<Bytes> {
        let disk = self.disk.as_ref()?;
        let record = match disk.get(key.artifact_key()) {
            Ok(record) => record?,
            Err(e) => {
                warn!("Disk cache read failed for {}: {}", key, e);
                return None;
            }
        };
        let (revision, bytes) = decode_record(&record)?;
        (revision == key.revision()).then_some(bytes)
    }
}

// Disk record layout: the revision the content was cached at, a newline, then
// the raw bytes. Revision tokens are shas or content hashes and never contain
// a newline themselves.
fn encode_record(revision: &str, bytes: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(revision.len() + 1 + bytes.len());
    record.extend_from_slice(revision.as_bytes());
    record.push(b'\n');
    record.extend_from_slice(bytes);
    record
}

fn decode_record(record: &[u8]) -> Option<(&str, Bytes)> {
    let split = record.iter().position(|&b| b == b'\n')?;
    let revision = std::str::from_utf8(&record[..split]).ok()?;
    Some((revision, Bytes::copy_from_slice(&record[split + 1..])))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn memory_only() -> ArtifactCache {
        ArtifactCache::new(&CacheConfig {
            memory_enabled: true,
            disk_enabled: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn disk_only(path: &Path) -> ArtifactCache {
        ArtifactCache::new(&CacheConfig {
            memory_enabled: false,
            disk_enabled: true,
            disk_path: Some(path.to_path_buf()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = memory_only();
        let key = CacheKey::new("u1/paper_100.pdf", "rev-a");

        assert!(cache.get(&key).await.is_none());
        cache.insert(&key, Bytes::from_static(b"pdf bytes")).await;
        assert_eq!(cache.get(&key).await, Some(Bytes::from_static(b"pdf bytes")));
    }

    #[tokio::test]
    async fn test_new_revision_misses() {
        let cache = memory_only();
        cache
            .insert(&CacheKey::new("u1/paper_100.md", "rev-a"), Bytes::from_static(b"old"))
            .await;
        assert!(cache
            .get(&CacheKey::new("u1/paper_100.md", "rev-b"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_disk_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache");
        let key = CacheKey::new("u1/paper_100.pdf", "rev-a");

        {
            let cache = disk_only(&path);
            cache.insert(&key, Bytes::from_static(b"persisted")).await;
        }

        let reopened = disk_only(&path);
        assert_eq!(reopened.get(&key).await, Some(Bytes::from_static(b"persisted")));
    }

    #[tokio::test]
    async fn test_disk_rewrite_reclaims_slot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = disk_only(&dir.path().join("cache"));

        cache
            .insert(&CacheKey::new("u1/paper_100.md", "rev-a"), Bytes::from_static(b"old"))
            .await;
        cache
            .insert(&CacheKey::new("u1/paper_100.md", "rev-b"), Bytes::from_static(b"new"))
            .await;

        // One slot per artifact key: the old revision is gone, not shadowed.
        assert!(cache
            .get(&CacheKey::new("u1/paper_100.md", "rev-a"))
            .await
            .is_none());
        assert_eq!(
            cache.get(&CacheKey::new("u1/paper_100.md", "rev-b")).await,
            Some(Bytes::from_static(b"new"))
        );
    }

    #[test]
    fn test_record_round_trip() {
        let record = encode_record("rev-a", b"content\nwith newline");
        let (revision, bytes) = decode_record(&record).unwrap();
        assert_eq!(revision, "rev-a");
        assert_eq!(bytes, Bytes::from_static(b"content\nwith newline"));
    }
}
