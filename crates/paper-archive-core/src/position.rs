//! Position mapping between source pages and the translated linear text.
//!
//! The mapper is an immutable, ordered checkpoint table built once per
//! reading session, either from the page tags recorded at extraction time or
//! from the page-break markers embedded in an archived markdown artifact.
//! Both lookups are pure binary searches; the event-loop scroll binding lives
//! entirely in the web adapter.

use serde::Serialize;

/// Marker written between pages in every markdown artifact, so position maps
/// can be rebuilt from archived text alone.
pub const PAGE_BREAK: &str = "[[PAGE_BREAK]]";

/// One anchor tying a source page to an offset in the linear text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// 0-based page in the source document.
    pub page_index: usize,
    /// 0-based byte offset into the text.
    pub text_offset: usize,
}

/// Immutable ordered checkpoint table, strictly monotonic in both fields.
///
/// Rebuilt whole whenever the underlying document changes, never mutated.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    checkpoints: Vec<Checkpoint>,
}

impl PositionMap {
    /// Build a map from checkpoints, dropping any that would break strict
    /// monotonicity in either field.
    pub fn new(checkpoints: impl IntoIterator<Item = Checkpoint>) -> Self {
        let mut kept: Vec<Checkpoint> = Vec::new();
        for cp in checkpoints {
            match kept.last() {
                Some(last) if cp.page_index <= last.page_index || cp.text_offset <= last.text_offset => {}
                _ => kept.push(cp),
            }
        }
        Self { checkpoints: kept }
    }

    /// Build from paragraphs tagged with their source page at extraction
    /// time. A checkpoint is laid down at the first paragraph of each page.
    pub fn from_tagged_paragraphs<'a>(
        paragraphs: impl IntoIterator<Item = (usize, &'a str)>,
    ) -> Self {
        let mut checkpoints = Vec::new();
        let mut offset = 0;
        let mut last_page = None;
        for (page, text) in paragraphs {
            if last_page != Some(page) {
                checkpoints.push(Checkpoint {
                    page_index: page,
                    text_offset: offset,
                });
                last_page = Some(page);
            }
            // Paragraphs are joined with a blank line in the linear text.
            offset += text.len() + 2;
        }
        Self::new(checkpoints)
    }

    /// Rebuild from an archived artifact by scanning its page-break markers.
    /// Page 0 starts at offset 0; page n starts just past the n-th marker.
    pub fn from_marked_text(text: &str) -> Self {
        let mut checkpoints = vec![Checkpoint {
            page_index: 0,
            text_offset: 0,
        }];
        let mut page = 0;
        let mut search_from = 0;
        while let Some(pos) = text[search_from..].find(PAGE_BREAK) {
            let marker_end = search_from + pos + PAGE_BREAK.len();
            page += 1;
            checkpoints.push(Checkpoint {
                page_index: page,
                text_offset: marker_end,
            });
            search_from = marker_end;
        }
        Self::new(checkpoints)
    }

    /// Page containing `offset`: greatest checkpoint with
    /// `text_offset <= offset`. Offsets before the first checkpoint map to
    /// page 0.
    pub fn page_for_offset(&self, offset: usize) -> usize {
        let idx = self
            .checkpoints
            .partition_point(|cp| cp.text_offset <= offset);
        if idx == 0 {
            0
        } else {
            self.checkpoints[idx - 1].page_index
        }
    }

    /// Inverse lookup: offset of the greatest checkpoint with
    /// `page_index <= page_index`.
    pub fn offset_for_page(&self, page_index: usize) -> usize {
        let idx = self
            .checkpoints
            .partition_point(|cp| cp.page_index <= page_index);
        if idx == 0 {
            0
        } else {
            self.checkpoints[idx - 1].text_offset
        }
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn page_count(&self) -> usize {
        self.checkpoints
            .last()
            .map_or(0, |cp| cp.page_index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

/// Scroll-sync policy for the reading view.
///
/// The translated-text view drives: when its visible position crosses
/// `anticipation` of the viewport past a checkpoint, the source view is
/// commanded to that checkpoint's page. The fraction anticipates the reader's
/// focal point instead of lagging one paragraph behind it; it is a tuning
/// constant, not a correctness constant.
#[derive(Debug, Clone, Copy)]
pub struct SyncPolicy {
    /// Viewport fraction from the top used as the probe point.
    pub anticipation: f32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { anticipation: 0.30 }
    }
}

impl SyncPolicy {
    pub const fn new(anticipation: f32) -> Self {
        Self { anticipation }
    }

    /// Text offset probed for the page command, given the top of the visible
    /// window and its span (both in text offsets).
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn probe_offset(&self, viewport_top: usize, viewport_span: usize) -> usize {
        viewport_top + (viewport_span as f32 * self.anticipation).round().max(0.0) as usize
    }

    /// Page the source view should display for the given text viewport.
    pub fn page_command(&self, map: &PositionMap, viewport_top: usize, viewport_span: usize) -> usize {
        map.page_for_offset(self.probe_offset(viewport_top, viewport_span))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cp(page_index: usize, text_offset: usize) -> Checkpoint {
        Checkpoint {
            page_index,
            text_offset,
        }
    }

    #[test]
    fn test_two_checkpoint_arithmetic() {
        let map = PositionMap::new([cp(0, 0), cp(1, 500)]);
        assert_eq!(map.page_for_offset(499), 0);
        assert_eq!(map.page_for_offset(500), 1);
        assert_eq!(map.offset_for_page(1), 500);
        assert_eq!(map.offset_for_page(0), 0);
    }

    #[test]
    fn test_page_for_offset_is_monotonic() {
        let map = PositionMap::new([cp(0, 0), cp(2, 100), cp(5, 350), cp(6, 900)]);
        let mut prev = 0;
        for offset in 0..1000 {
            let page = map.page_for_offset(offset);
            assert!(page >= prev, "page must not decrease at offset {offset}");
            prev = page;
        }
    }

    #[test]
    fn test_offset_before_first_checkpoint_is_page_zero() {
        let map = PositionMap::new([cp(3, 200), cp(4, 400)]);
        assert_eq!(map.page_for_offset(0), 0);
        assert_eq!(map.page_for_offset(199), 0);
        assert_eq!(map.page_for_offset(200), 3);
    }

    #[test]
    fn test_non_monotonic_checkpoints_are_dropped() {
        let map = PositionMap::new([cp(0, 0), cp(1, 500), cp(1, 600), cp(2, 400), cp(3, 700)]);
        assert_eq!(map.checkpoints().len(), 3);
        assert_eq!(map.page_for_offset(650), 1);
        assert_eq!(map.page_for_offset(700), 3);
    }

    #[test]
    fn test_from_marked_text() {
        let text = format!("page zero text\n\n{PAGE_BREAK}\n\npage one\n\n{PAGE_BREAK}\n\npage two");
        let map = PositionMap::from_marked_text(&text);
        assert_eq!(map.page_count(), 3);
        assert_eq!(map.page_for_offset(0), 0);
        let one_start = map.offset_for_page(1);
        assert!(text[one_start..].trim_start().starts_with("page one"));
        assert_eq!(map.page_for_offset(text.len()), 2);
    }

    #[test]
    fn test_from_tagged_paragraphs() {
        let map = PositionMap::from_tagged_paragraphs([
            (0, "first paragraph"),
            (0, "second paragraph"),
            (1, "third paragraph"),
        ]);
        assert_eq!(map.page_count(), 2);
        assert_eq!(map.offset_for_page(0), 0);
        // "first paragraph" (15) + separator (2) + "second paragraph" (16) + separator (2)
        assert_eq!(map.offset_for_page(1), 35);
    }

    #[test]
    fn test_sync_policy_anticipates() {
        let map = PositionMap::new([cp(0, 0), cp(1, 500)]);
        let policy = SyncPolicy::default();
        // Top at 400, span 400: probe at 400 + 120 = 520, past the page-1 checkpoint.
        assert_eq!(policy.page_command(&map, 400, 400), 1);
        // Top at 300: probe at 420, still on page 0.
        assert_eq!(policy.page_command(&map, 300, 400), 0);
    }
}
