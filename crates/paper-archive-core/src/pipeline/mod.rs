//! Translation pipeline: the per-document state machine.
//!
//! `Uploaded → Extracted → (Translated)? → (Merged)? → Archived`, with
//! failure absorbing from any non-terminal state. Extraction failure is
//! terminal for the run — a PDF-only archive with no extracted text is a
//! failed run, not a degraded one. Translation failure degrades: the run
//! continues and archives the source, flagged. Archiving is the only
//! transition with an external side effect, and it is an idempotent
//! overwrite: re-running the same document rewrites the same keys.

mod merge;

pub use merge::{interleave, MergedText};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use crate::cleanup;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::naming::{DocumentId, Variant};
use crate::position::PAGE_BREAK;
use crate::store::ArchiveStore;
use crate::translator::Translator;

/// Pipeline states in order of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploaded,
    Extracted,
    Translated,
    Merged,
    Archived,
}

/// Tagged per-stage result, so callers can branch on exactly what was
/// produced instead of unpicking a swallowed error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped { reason: String },
    Failed { reason: String },
}

impl StageOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Per-upload processing options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UploadOptions {
    pub translate: bool,
    pub dual_merge: bool,
}

impl UploadOptions {
    /// Apply the continuous-reading preset: it forces both stages on for new
    /// uploads but changes nothing about failure handling.
    pub const fn with_preset(self, continuous_reading: bool) -> Self {
        if continuous_reading {
            Self {
                translate: true,
                dual_merge: true,
            }
        } else {
            self
        }
    }
}

/// What one pipeline run produced: the furthest state reached, per-stage
/// outcomes, and the keys written to the store.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: DocumentId,
    pub stage: Stage,
    pub extraction: StageOutcome,
    pub translation: StageOutcome,
    pub merge: StageOutcome,
    pub keys_written: Vec<String>,
    pub translation_failed: bool,
    pub alignment_degraded: bool,
    pub page_count: usize,
    /// Cleaned source-language markdown with page-break markers. Returned
    /// even when translation failed, so the caller can still display it.
    pub text: String,
    pub elapsed_ms: u64,
}

/// In-memory registry serializing runs per document identity.
///
/// Two concurrent runs for the same `(owner, title, created_at)` would race
/// to archive conflicting artifacts under the same keys; the second caller
/// gets a typed error instead of a queue. Runs for different documents
/// proceed independently.
#[derive(Debug, Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the run slot for `id`, or fail with `RunInProgress`.
    pub fn try_acquire(&self, id: &DocumentId) -> Result<RunGuard> {
        let token = id.to_string();
        let mut active = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !active.insert(token.clone()) {
            return Err(Error::RunInProgress(token));
        }
        Ok(RunGuard {
            token,
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Releases the run slot on drop, including on early return and panic.
pub struct RunGuard {
    token: String,
    inner: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.token);
    }
}

/// The pipeline runner, wired with its providers.
pub struct Pipeline {
    store: Arc<dyn ArchiveStore>,
    extractor: Arc<dyn Extractor>,
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    runs: ActiveRuns,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        extractor: Arc<dyn Extractor>,
        translator: Arc<dyn Translator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            translator,
            config,
            runs: ActiveRuns::new(),
        }
    }

    /// Drive one document through the full state machine.
    ///
    /// Errors returned here are terminal for the run: extraction failure,
    /// a concurrent run for the same identity, or a remote write failure
    /// (whose error names the artifact key, so the caller can retry it —
    /// keys already written stay in place and will be overwritten on retry).
    pub async fn run(
        &self,
        id: DocumentId,
        pdf_bytes: Bytes,
        options: UploadOptions,
    ) -> Result<RunReport> {
        let _guard = self.runs.try_acquire(&id)?;
        let options = options.with_preset(self.config.continuous_reading);
        let started = Instant::now();

        info!(
            "Pipeline run for {} (translate={}, dual_merge={})",
            id, options.translate, options.dual_merge
        );

        // Uploaded -> Extracted. Failure here is terminal: no source text
        // means nothing to archive as processed.
        let pages = self.extractor.extract(&pdf_bytes).await?;
        if pages.is_empty() {
            return Err(Error::ExtractionFailed("provider returned no pages".to_string()));
        }
        let page_count = pages.last().map_or(pages.len(), |p| p.page_index + 1);

        let source_text = pages
            .iter()
            .map(|p| cleanup::scrub(&p.markdown))
            .collect::<Vec<_>>()
            .join(&format!("\n\n{PAGE_BREAK}\n\n"));
        let mut stage = Stage::Extracted;

        // Extracted -> Translated, if requested. Provider failure degrades
        // to a source-only archive instead of aborting the run.
        let mut translation_failed = false;
        let (translated, translation_outcome) = if options.translate {
            match self.translator.translate(&source_text, &self.config.target_lang).await {
                Ok(text) => {
                    stage = Stage::Translated;
                    (Some(text), StageOutcome::Completed)
                }
                Err(e) => {
                    warn!("Translation failed for {}: {}", id, e);
                    translation_failed = true;
                    (None, StageOutcome::Failed { reason: e.to_string() })
                }
            }
        } else {
            (None, StageOutcome::skipped("translation not requested"))
        };

        // Translated -> Merged.
        let mut alignment_degraded = false;
        let (dual, merge_outcome) = match (&translated, options.dual_merge) {
            (Some(text), true) => {
                let merged = interleave(&source_text, text);
                if merged.alignment_degraded {
                    warn!("Paragraph alignment degraded for {}, pairing positionally", id);
                    alignment_degraded = true;
                }
                stage = Stage::Merged;
                (Some(merged.text), StageOutcome::Completed)
            }
            (None, true) if options.translate => {
                (None, StageOutcome::skipped("translation unavailable"))
            }
            _ => (None, StageOutcome::skipped("dual merge not requested")),
        };

        // * -> Archived: the only transition with an external side effect.
        let mut keys_written = Vec::new();

        let source_key = id.key(Variant::Source);
        self.store
            .put(&source_key, pdf_bytes, &format!("Add source: {source_key}"))
            .await?;
        keys_written.push(source_key);

        if let Some(text) = translated {
            let key = id.key(Variant::Translation);
            self.store
                .put(&key, Bytes::from(text), &format!("Add translation: {key}"))
                .await?;
            keys_written.push(key);
        }

        if let Some(text) = dual {
            let key = id.key(Variant::Dual);
            self.store
                .put(&key, Bytes::from(text), &format!("Add dual merge: {key}"))
                .await?;
            keys_written.push(key);
        }

        // A degraded run still archives the source but reports the stage the
        // degradation hit, so callers can see the document never advanced.
        if !translation_failed {
            stage = stage.max(Stage::Archived);
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Archived {} key(s) for {} in {}ms",
            keys_written.len(),
            id,
            elapsed_ms
        );

        Ok(RunReport {
            id,
            stage,
            extraction: StageOutcome::Completed,
            translation: translation_outcome,
            merge: merge_outcome,
            keys_written,
            translation_failed,
            alignment_degraded,
            page_count,
            text: source_text,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::naming::OwnerId;

    fn doc_id() -> DocumentId {
        DocumentId::new(OwnerId::new("u1").unwrap(), "paper", 100)
    }

    #[test]
    fn test_active_runs_rejects_reentry() {
        let runs = ActiveRuns::new();
        let id = doc_id();

        let guard = runs.try_acquire(&id).unwrap();
        assert!(matches!(runs.try_acquire(&id), Err(Error::RunInProgress(_))));
        drop(guard);
        assert!(runs.try_acquire(&id).is_ok());
    }

    #[test]
    fn test_active_runs_independent_documents() {
        let runs = ActiveRuns::new();
        let a = doc_id();
        let b = DocumentId::new(OwnerId::new("u1").unwrap(), "paper", 200);

        let _ga = runs.try_acquire(&a).unwrap();
        assert!(runs.try_acquire(&b).is_ok());
    }

    #[test]
    fn test_preset_forces_both_options() {
        let options = UploadOptions::default().with_preset(true);
        assert!(options.translate);
        assert!(options.dual_merge);

        let options = UploadOptions { translate: true, dual_merge: false }.with_preset(false);
        assert!(options.translate);
        assert!(!options.dual_merge);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Uploaded < Stage::Extracted);
        assert!(Stage::Extracted < Stage::Translated);
        assert!(Stage::Merged < Stage::Archived);
    }
}
