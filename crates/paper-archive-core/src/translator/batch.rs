//! Paragraph-boundary batching for translation requests.
//!
//! The provider takes the whole document as one logical request, but chat
//! completions degrade past a few thousand characters of input. Text is
//! packed into batches along paragraph (blank-line) boundaries; only a
//! paragraph that alone exceeds the budget is split further, on single
//! newlines. Table-of-contents text additionally breaks at chapter headings
//! so one batch never mixes unrelated TOC sections.

use regex::Regex;
use std::sync::LazyLock;

use crate::cleanup::is_likely_toc;

static CHAPTER_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+\S").expect("valid regex"));

/// Split `text` into batches of at most `max_chars` characters each
/// (paragraphs longer than the budget excepted, split on line boundaries).
pub fn split_batches(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let toc_mode = is_likely_toc(text);

    let mut batches: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    let mut flush = |current: &mut Vec<&str>, current_len: &mut usize, batches: &mut Vec<String>| {
        if !current.is_empty() {
            batches.push(current.join("\n\n"));
            current.clear();
            *current_len = 0;
        }
    };

    for para in text.split("\n\n") {
        let para_len = para.chars().count();

        if toc_mode && CHAPTER_HEADING.is_match(para.trim_start()) {
            flush(&mut current, &mut current_len, &mut batches);
        }

        if para_len > max_chars {
            flush(&mut current, &mut current_len, &mut batches);
            split_oversized(para, max_chars, &mut batches);
        } else if current_len + para_len > max_chars && !current.is_empty() {
            flush(&mut current, &mut current_len, &mut batches);
            current.push(para);
            current_len = para_len;
        } else {
            current.push(para);
            current_len += para_len;
        }
    }

    flush(&mut current, &mut current_len, &mut batches);
    batches
}

/// Split one oversized paragraph on single newlines.
fn split_oversized(para: &str, max_chars: usize, batches: &mut Vec<String>) {
    let mut chunk: Vec<&str> = Vec::new();
    let mut chunk_len = 0;
    for line in para.split('\n') {
        let line_len = line.chars().count();
        if chunk_len + line_len > max_chars && !chunk.is_empty() {
            batches.push(chunk.join("\n"));
            chunk = vec![line];
            chunk_len = line_len;
        } else {
            chunk.push(line);
            chunk_len += line_len;
        }
    }
    if !chunk.is_empty() {
        batches.push(chunk.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_batch() {
        let batches = split_batches("one paragraph\n\ntwo paragraph", 2000);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], "one paragraph\n\ntwo paragraph");
    }

    #[test]
    fn test_batches_respect_budget() {
        let para = "x".repeat(600);
        let text = [para.as_str(); 5].join("\n\n");
        let batches = split_batches(&text, 2000);
        assert!(batches.len() >= 2);
        for batch in &batches {
            assert!(batch.chars().count() <= 2000 + 8); // separators
        }
    }

    #[test]
    fn test_reassembly_loses_nothing() {
        let text = "alpha\n\nbeta\n\ngamma\n\ndelta";
        let batches = split_batches(text, 12);
        assert_eq!(batches.join("\n\n"), text);
    }

    #[test]
    fn test_oversized_paragraph_splits_on_lines() {
        let para = (0..40).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let batches = split_batches(&para, 50);
        assert!(batches.len() > 1);
        assert_eq!(batches.join("\n"), para);
    }

    #[test]
    fn test_toc_breaks_at_chapter_headings() {
        let text = "Introduction 4\nBackground 5\nMethods 7\n\n1 Introduction\nbody\n\n2 Methods\nbody";
        let batches = split_batches(text, 2000);
        assert!(batches.len() >= 3, "chapter headings should start new batches: {batches:?}");
        assert!(batches[1].starts_with("1 Introduction"));
        assert!(batches[2].starts_with("2 Methods"));
    }
}
