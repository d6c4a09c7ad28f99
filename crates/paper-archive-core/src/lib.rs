//! Paper Archive Core Library
//!
//! This library provides the core functionality for archiving academic papers:
//! - Canonical artifact naming (encode/decode key codec)
//! - OCR extraction and AI translation via external providers
//! - A remote object store (GitHub repository) as the persistence layer
//! - History listing, deletion and position mapping for bilingual reading

pub mod cache;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod naming;
pub mod pipeline;
pub mod position;
pub mod store;
pub mod translator;

pub use cache::{clear_artifact_cache, ArtifactCache, CacheKey};
pub use config::{AppConfig, Lang, DEFAULT_TARGET_LANG};
pub use error::{Error, Result};
pub use extract::{ExtractedPage, Extractor, MistralExtractor};
pub use history::{DeleteReport, FailedDelete, HistoryEntry};
pub use naming::{DocumentId, MonotonicClock, OwnerId, Variant};
pub use pipeline::{Pipeline, RunReport, Stage, StageOutcome, UploadOptions};
pub use position::{Checkpoint, PositionMap, SyncPolicy, PAGE_BREAK};
pub use store::{ArchiveStore, GithubStore, MemoryStore, ObjectInfo};
pub use translator::{create_translator, DeepSeekTranslator, Translator};

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// High-level archive facade combining all components.
///
/// This is the single point through which credentialed calls to the store and
/// providers are issued; the presentation layer only ever sees owner ids,
/// keys and bytes, never a token.
pub struct PaperArchive {
    store: Arc<dyn ArchiveStore>,
    pipeline: Pipeline,
    cache: ArtifactCache,
    clock: MonotonicClock,
    config: AppConfig,
}

impl PaperArchive {
    /// Create an archive with the configured providers
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let store = store::create_store(&config.store)?;
        let extractor = extract::create_extractor(&config.ocr)?;
        let translator = translator::create_translator(&config.translator)?;
        Self::with_providers(store, extractor, translator, config)
    }

    /// Create with custom providers (used by tests and local development)
    pub fn with_providers(
        store: Arc<dyn ArchiveStore>,
        extractor: Arc<dyn Extractor>,
        translator: Arc<dyn Translator>,
        config: AppConfig,
    ) -> Result<Self> {
        let cache = ArtifactCache::new(&config.cache)?;
        let pipeline = Pipeline::new(
            Arc::clone(&store),
            extractor,
            translator,
            config.pipeline.clone(),
        );

        Ok(Self {
            store,
            pipeline,
            cache,
            clock: MonotonicClock::new(),
            config,
        })
    }

    /// Rebuild the ordered history for one owner from a fresh listing.
    ///
    /// Always recomputed, never cached across requests: recomputation is
    /// cheap and a stale index is not.
    pub async fn history(&self, owner: &OwnerId) -> Result<Vec<HistoryEntry>> {
        let listing = self.store.list(&owner.prefix()).await?;
        Ok(history::build(&listing, owner))
    }

    /// Upload a PDF and drive it through the translation pipeline.
    ///
    /// Assigns the document its identity (title sanitized, timestamp drawn
    /// once from the monotonic clock) and archives every artifact the run
    /// produces.
    pub async fn upload_and_process(
        &self,
        owner: OwnerId,
        title: &str,
        pdf_bytes: Bytes,
        options: UploadOptions,
    ) -> Result<RunReport> {
        let id = DocumentId::new(owner, title, self.clock.now_ms());
        self.pipeline.run(id, pdf_bytes, options).await
    }

    /// Delete every artifact of a document.
    ///
    /// All three candidate variant keys are attempted; keys that are already
    /// absent delete as no-ops. Any individual failure yields a partial
    /// report listing what still needs retrying — success is never claimed
    /// unless every key is confirmed absent.
    pub async fn delete_document(&self, id: DocumentId) -> DeleteReport {
        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        for key in id.all_keys() {
            match self.store.delete(&key).await {
                Ok(()) => deleted.push(key),
                Err(e) => {
                    failed.push(FailedDelete {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Deleted {} key(s) for {} ({} failed)",
            deleted.len(),
            id,
            failed.len()
        );

        DeleteReport {
            id,
            deleted,
            failed,
        }
    }

    /// Fetch one artifact's bytes through the content cache.
    ///
    /// The store revision is resolved from a fresh listing, so an artifact
    /// rewritten out of band misses the cache and is re-fetched.
    pub async fn fetch_artifact(&self, id: &DocumentId, variant: Variant) -> Result<Bytes> {
        let key = id.key(variant);
        let listing = self.store.list(&id.owner.prefix()).await?;
        let revision = listing
            .iter()
            .find(|object| object.key == key)
            .map(|object| object.revision.clone())
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        let cache_key = CacheKey::new(key.as_str(), revision);
        if let Some(bytes) = self.cache.get(&cache_key).await {
            debug!("Cache hit for {}", cache_key);
            return Ok(bytes);
        }

        let bytes = self.store.get(&key).await?;
        self.cache.insert(&cache_key, bytes.clone()).await;
        Ok(bytes)
    }

    /// Text an opened document is read from: the translation artifact when
    /// present, the dual merge otherwise. Both embed page-break markers, so
    /// the position map rebuilds from archived text alone.
    pub async fn reading_text(&self, id: &DocumentId) -> Result<(String, Variant)> {
        for variant in [Variant::Translation, Variant::Dual] {
            match self.fetch_artifact(id, variant).await {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    return Ok((text, variant));
                }
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Err(Error::NotFound(id.key(Variant::Translation)))
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Scroll-sync policy configured for this archive.
    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy::new(self.config.pipeline.anticipation)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
