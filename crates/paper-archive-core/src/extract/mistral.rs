//! Mistral OCR client.
//!
//! Documents go to the provider as base64 data URIs, split into page ranges
//! of `chunk_pages` so a single oversized request never takes the whole run
//! down. Returned page indices are local to a chunk and get offset back into
//! document coordinates here.

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{split_page_ranges, ExtractedPage, Extractor};
use crate::config::OcrConfig;
use crate::error::{Error, Result};

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]*)\)").expect("valid regex"));

pub struct MistralExtractor {
    client: Client,
    config: OcrConfig,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument<'a>,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
struct OcrDocument<'a> {
    #[serde(rename = "type")]
    document_type: &'a str,
    document_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    index: usize,
    markdown: String,
    #[serde(default)]
    images: Vec<OcrImage>,
}

#[derive(Debug, Deserialize)]
struct OcrImage {
    id: String,
    image_base64: Option<String>,
}

impl MistralExtractor {
    /// Create an extractor for the configured OCR endpoint.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(config: OcrConfig) -> Self {
        let client = Client::builder()
            // OCR on a 5-page chunk routinely takes tens of seconds.
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn extract_chunk(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedPage>> {
        let data_uri = format!(
            "data:application/pdf;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(pdf_bytes)
        );

        let request = OcrRequest {
            model: &self.config.model,
            document: OcrDocument {
                document_type: "document_url",
                document_url: &data_uri,
            },
            include_image_base64: self.config.include_images,
        };

        let url = format!("{}/ocr", self.config.api_base.trim_end_matches('/'));
        let mut req = self.client.post(&url).json(&request);
        if let Some(ref key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::ExtractionFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("OCR request failed: {} - {}", status, body);
            return Err(Error::ExtractionFailed(format!("HTTP {status}: {body}")));
        }

        let response: OcrResponse = resp
            .json()
            .await
            .map_err(|e| Error::ExtractionFailed(format!("invalid response: {e}")))?;

        Ok(response
            .pages
            .into_iter()
            .map(|page| {
                let markdown = if self.config.include_images {
                    inline_images(&page.markdown, &page.images)
                } else {
                    page.markdown
                };
                ExtractedPage {
                    page_index: page.index,
                    markdown,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Extractor for MistralExtractor {
    fn name(&self) -> &'static str {
        "mistral-ocr"
    }

    async fn extract(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedPage>> {
        let ranges = split_page_ranges(pdf_bytes, self.config.chunk_pages)?;
        info!(
            "Extracting {} page range(s) with {}",
            ranges.len(),
            self.config.model
        );

        let mut pages = Vec::new();
        for range in ranges {
            debug!(
                "OCR chunk starting at page {} ({} pages)",
                range.start_page, range.page_count
            );
            let chunk_pages = self.extract_chunk(&range.pdf_bytes).await?;
            for mut page in chunk_pages {
                page.page_index += range.start_page;
                pages.push(page);
            }
        }

        pages.sort_by_key(|p| p.page_index);
        Ok(pages)
    }
}

/// Replace image references in page markdown with base64 data URIs.
///
/// The provider returns images out of band, referenced by id in the
/// markdown; inlining them keeps the artifact self-contained.
fn inline_images(markdown: &str, images: &[OcrImage]) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }

    let map: HashMap<&str, &str> = images
        .iter()
        .filter_map(|img| img.image_base64.as_deref().map(|b64| (img.id.as_str(), b64)))
        .collect();

    IMAGE_REF
        .replace_all(markdown, |caps: &regex::Captures<'_>| {
            match map.get(&caps[1]) {
                Some(b64) if b64.starts_with("data:") => format!("![image]({b64})"),
                Some(b64) => format!("![image](data:image/jpeg;base64,{b64})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_images_replaces_known_ids() {
        let images = vec![OcrImage {
            id: "img-0.jpeg".to_string(),
            image_base64: Some("AAAA".to_string()),
        }];
        let out = inline_images("see ![fig](img-0.jpeg) here", &images);
        assert_eq!(out, "see ![image](data:image/jpeg;base64,AAAA) here");
    }

    #[test]
    fn test_inline_images_keeps_unknown_refs() {
        let out = inline_images("see ![fig](missing.jpeg)", &[]);
        assert_eq!(out, "see ![fig](missing.jpeg)");
    }

    #[test]
    fn test_inline_images_preserves_existing_data_uris() {
        let images = vec![OcrImage {
            id: "img-1".to_string(),
            image_base64: Some("data:image/png;base64,BBBB".to_string()),
        }];
        let out = inline_images("![x](img-1)", &images);
        assert_eq!(out, "![image](data:image/png;base64,BBBB)");
    }
}
