/// Address of one artifact's content in the cache.
///
/// Artifacts are immutable per store revision: the same `(key, revision)`
/// pair always names the same bytes, so cached content never goes stale and
/// a rewrite under the same key (new revision) misses naturally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    revision: String,
}

impl CacheKey {
    pub fn new(artifact_key: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            key: artifact_key.into(),
            revision: revision.into(),
        }
    }

    /// The artifact's store key, e.g. `u1/paper_100.pdf`.
    pub fn artifact_key(&self) -> &str {
        &self.key
    }

    /// The store's revision token for the content (blob sha or content hash).
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.key, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_differs_by_revision() {
        assert_ne!(
            CacheKey::new("u1/paper_100.pdf", "rev-a"),
            CacheKey::new("u1/paper_100.pdf", "rev-b")
        );
    }

    #[test]
    fn test_cache_key_differs_by_artifact() {
        assert_ne!(
            CacheKey::new("u1/paper_100.pdf", "rev-a"),
            CacheKey::new("u1/paper_100.md", "rev-a")
        );
    }

    #[test]
    fn test_cache_key_same_inputs_same_key() {
        assert_eq!(
            CacheKey::new("u1/paper_100.pdf", "rev-a"),
            CacheKey::new("u1/paper_100.pdf", "rev-a")
        );
    }

    #[test]
    fn test_display_names_key_and_revision() {
        let key = CacheKey::new("u1/paper_100.pdf", "rev-a");
        assert_eq!(key.to_string(), "u1/paper_100.pdf@rev-a");
    }
}
