//! Dual-language artifact construction.
//!
//! Original and translated paragraphs are interleaved 1:1 by position in the
//! extraction's paragraph sequence, the translation rendered as a blockquote
//! under its source paragraph. When the translator returns a different
//! paragraph count, alignment degrades to positional pairing with the surplus
//! side appended unpaired at the end — a documented lossy fallback, not a
//! failure.

use crate::position::PAGE_BREAK;

/// Result of a dual merge: the artifact text plus whether paragraph alignment
/// had to degrade.
#[derive(Debug)]
pub struct MergedText {
    pub text: String,
    pub alignment_degraded: bool,
}

/// Interleave original and translated text in document order.
pub fn interleave(original: &str, translated: &str) -> MergedText {
    let source: Vec<&str> = original.split("\n\n").collect();
    let target: Vec<&str> = translated.split("\n\n").collect();
    let alignment_degraded = source.len() != target.len();

    let mut blocks: Vec<String> = Vec::with_capacity(source.len() + target.len());
    let paired = source.len().min(target.len());

    for i in 0..paired {
        let o = source[i];
        let t = target[i];

        // Page markers appear on both sides; emit one, never a quoted copy.
        if o.trim() == PAGE_BREAK {
            blocks.push(o.to_string());
            if t.trim() != PAGE_BREAK && !t.trim().is_empty() {
                blocks.push(blockquote(t));
            }
            continue;
        }

        blocks.push(o.to_string());
        if !t.trim().is_empty() && t.trim() != PAGE_BREAK && t.trim() != o.trim() {
            blocks.push(blockquote(t));
        }
    }

    // Surplus paragraphs from the longer side, unpaired.
    for o in &source[paired..] {
        blocks.push((*o).to_string());
    }
    for t in &target[paired..] {
        if t.trim() == PAGE_BREAK {
            blocks.push((*t).to_string());
        } else if !t.trim().is_empty() {
            blocks.push(blockquote(t));
        }
    }

    MergedText {
        text: blocks.join("\n\n"),
        alignment_degraded,
    }
}

fn blockquote(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_merge_interleaves() {
        let merged = interleave("First.\n\nSecond.", "Primero.\n\nSegundo.");
        assert!(!merged.alignment_degraded);
        assert_eq!(merged.text, "First.\n\n> Primero.\n\nSecond.\n\n> Segundo.");
    }

    #[test]
    fn test_mismatched_counts_degrade_with_surplus_appended() {
        let merged = interleave("A.\n\nB.\n\nC.", "A'.");
        assert!(merged.alignment_degraded);
        assert_eq!(merged.text, "A.\n\n> A'.\n\nB.\n\nC.");

        let merged = interleave("A.", "A'.\n\nB'.");
        assert!(merged.alignment_degraded);
        assert_eq!(merged.text, "A.\n\n> A'.\n\n> B'.");
    }

    #[test]
    fn test_page_markers_emitted_once() {
        let original = format!("One.\n\n{PAGE_BREAK}\n\nTwo.");
        let translated = format!("Uno.\n\n{PAGE_BREAK}\n\nDos.");
        let merged = interleave(&original, &translated);
        assert!(!merged.alignment_degraded);
        assert_eq!(merged.text.matches(PAGE_BREAK).count(), 1);
        assert_eq!(
            merged.text,
            format!("One.\n\n> Uno.\n\n{PAGE_BREAK}\n\nTwo.\n\n> Dos.")
        );
    }

    #[test]
    fn test_multiline_translation_quoted_per_line() {
        let merged = interleave("Para.", "line one\nline two");
        assert_eq!(merged.text, "Para.\n\n> line one\n> line two");
    }

    #[test]
    fn test_identical_paragraph_not_duplicated() {
        // Headings and pure-placeholder paragraphs often come back verbatim.
        let merged = interleave("# 1. Introduction", "# 1. Introduction");
        assert_eq!(merged.text, "# 1. Introduction");
    }
}
