//! Page-range splitting for chunked OCR.
//!
//! OCR providers cap the document size per request, so large PDFs are sent
//! as consecutive page ranges and the returned page indices are offset back
//! into document coordinates by the caller.

use lopdf::Document;
use tracing::debug;

use crate::error::{Error, Result};

/// A consecutive page range rendered as a standalone PDF.
#[derive(Debug)]
pub struct PageRange {
    /// 0-based index of the range's first page in the original document.
    pub start_page: usize,
    /// Number of pages in this range.
    pub page_count: usize,
    pub pdf_bytes: Vec<u8>,
}

/// Split a PDF into ranges of at most `chunk_pages` pages.
///
/// A document that fits in one chunk is still re-serialized through the same
/// path, which keeps the output independent of the input's object layout.
pub fn split_page_ranges(pdf_bytes: &[u8], chunk_pages: usize) -> Result<Vec<PageRange>> {
    let chunk_pages = chunk_pages.max(1);

    let document = Document::load_mem(pdf_bytes).map_err(|e| Error::PdfSplit(e.to_string()))?;
    let total_pages = document.get_pages().len();
    if total_pages == 0 {
        return Err(Error::PdfSplit("document has no pages".to_string()));
    }

    let mut ranges = Vec::with_capacity(total_pages.div_ceil(chunk_pages));

    for start_page in (0..total_pages).step_by(chunk_pages) {
        let end_page = (start_page + chunk_pages).min(total_pages);

        // lopdf numbers pages from 1; drop everything outside the range.
        let delete: Vec<u32> = (1..=total_pages)
            .filter(|&n| n <= start_page || n > end_page)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .collect();

        let mut chunk = document.clone();
        if !delete.is_empty() {
            chunk.delete_pages(&delete);
        }
        chunk.prune_objects();

        let mut buffer = Vec::new();
        chunk
            .save_to(&mut buffer)
            .map_err(|e| Error::PdfSplit(e.to_string()))?;

        debug!(
            "Split pages {}..{} of {} into {} bytes",
            start_page,
            end_page,
            total_pages,
            buffer.len()
        );

        ranges.push(PageRange {
            start_page,
            page_count: end_page - start_page,
            pdf_bytes: buffer,
        });
    }

    Ok(ranges)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    /// Build a minimal valid PDF with `n` empty pages.
    fn pdf_with_pages(n: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..n)
            .map(|_| {
                let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                });
                page_id.into()
            })
            .collect();

        let count = i64::try_from(n).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_split_into_expected_ranges() {
        let pdf = pdf_with_pages(12);
        let ranges = split_page_ranges(&pdf, 5).unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(
            ranges.iter().map(|r| (r.start_page, r.page_count)).collect::<Vec<_>>(),
            [(0, 5), (5, 5), (10, 2)]
        );
        for range in &ranges {
            let chunk = Document::load_mem(&range.pdf_bytes).unwrap();
            assert_eq!(chunk.get_pages().len(), range.page_count);
        }
    }

    #[test]
    fn test_small_document_is_one_range() {
        let pdf = pdf_with_pages(3);
        let ranges = split_page_ranges(&pdf, 5).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start_page, 0);
        assert_eq!(ranges[0].page_count, 3);
    }

    #[test]
    fn test_invalid_bytes_fail() {
        assert!(split_page_ranges(b"not a pdf", 5).is_err());
    }
}
