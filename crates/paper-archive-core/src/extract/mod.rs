mod mistral;
mod split;

pub use mistral::MistralExtractor;
pub use split::split_page_ranges;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::OcrConfig;
use crate::error::Result;

/// One page of OCR output, tagged with its index in the source document.
/// The page tag is what the position mapper anchors its checkpoints to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// 0-based index in the source document.
    pub page_index: usize,
    /// Page content as markdown.
    pub markdown: String,
}

/// OCR extraction provider.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract the document's pages, in document order.
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedPage>>;
}

/// Create the configured extraction backend.
pub fn create_extractor(config: &OcrConfig) -> Result<Arc<dyn Extractor>> {
    Ok(Arc::new(MistralExtractor::new(config.clone())))
}
