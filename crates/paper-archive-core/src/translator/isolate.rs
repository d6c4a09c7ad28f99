//! Protected-span isolation for translation requests.
//!
//! Code fences, images, tables, math and page-break markers must reach the
//! archive byte-identical; a chat model will happily mangle any of them. Each
//! span is swapped for an opaque placeholder before the request and restored
//! from the vault afterwards. Protection order matters: code fences go first
//! so math-looking text inside them is never double-vaulted.

use regex::Regex;
use std::sync::LazyLock;

use crate::position::PAGE_BREAK;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));

static TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^\|.*\|[ \t]*\n?)+").expect("valid regex"));

static MATH_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$.*?\$\$").expect("valid regex"));

// No look-around in the regex crate; a single-line non-greedy body between
// bare `$` delimiters covers real OCR output well enough.
static MATH_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[^\s$][^$\n]*\$").expect("valid regex"));

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[PAGE_BREAK\]\]").expect("valid regex"));

/// Ordered vault of protected spans for one request.
#[derive(Debug, Default)]
pub struct SpanVault {
    spans: Vec<(String, String)>,
}

impl SpanVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap every match of `pattern` for a `[[__{prefix}_{n}__]]` placeholder.
    fn protect(&mut self, text: &str, pattern: &Regex, prefix: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let key = format!("[[__{}_{}__]]", prefix, self.spans.len());
                self.spans.push((key.clone(), caps[0].to_string()));
                key
            })
            .into_owned()
    }

    /// Vault everything that must survive the model untouched.
    pub fn protect_all(&mut self, text: &str) -> String {
        let text = self.protect(text, &CODE_FENCE, "CODE");
        let text = self.protect(&text, &IMAGE, "IMG");
        let text = self.protect(&text, &TABLE, "TBL");
        let text = self.protect(&text, &MATH_BLOCK, "EQ_BLOCK");
        let text = self.protect(&text, &MATH_INLINE, "EQ_INLINE");
        self.protect(&text, &PAGE_MARKER, "PB")
    }

    /// Restore placeholders back to their original spans.
    ///
    /// Plain string replacement, not regex: the vaulted content may itself
    /// contain regex metacharacters.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, content) in &self.spans {
            out = out.replace(key, content);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_identity() {
        let input = format!(
            "Intro with $x^2$ math.\n\n$$\\sum_i a_i$$\n\n```rust\nlet x = 1;\n```\n\n\
             ![image](data:image/jpeg;base64,AAAA)\n\n| a | b |\n| - | - |\n\n{PAGE_BREAK}\n\nEnd."
        );
        let mut vault = SpanVault::new();
        let protected = vault.protect_all(&input);
        assert_eq!(vault.restore(&protected), input);
    }

    #[test]
    fn test_protected_text_has_no_sensitive_content() {
        let input = "Before $$E = mc^2$$ after, inline $a+b$, and ![x](y.png).";
        let mut vault = SpanVault::new();
        let protected = vault.protect_all(input);
        assert!(!protected.contains("$$"));
        assert!(!protected.contains("mc^2"));
        assert!(!protected.contains("a+b"));
        assert!(!protected.contains("y.png"));
        assert_eq!(vault.len(), 3);
    }

    #[test]
    fn test_code_fence_shields_inner_math() {
        let input = "```\nprice is $5 and $6\n```";
        let mut vault = SpanVault::new();
        let protected = vault.protect_all(input);
        assert_eq!(vault.len(), 1, "fence vaulted whole, not its dollar signs");
        assert_eq!(vault.restore(&protected), input);
    }

    #[test]
    fn test_page_markers_are_protected() {
        let input = format!("one\n\n{PAGE_BREAK}\n\ntwo");
        let mut vault = SpanVault::new();
        let protected = vault.protect_all(&input);
        assert!(!protected.contains(PAGE_BREAK));
        assert_eq!(vault.restore(&protected), input);
    }

    #[test]
    fn test_table_block_vaulted_as_one_span() {
        let input = "| h1 | h2 |\n| -- | -- |\n| a | b |\n";
        let mut vault = SpanVault::new();
        vault.protect_all(input);
        assert_eq!(vault.len(), 1);
    }
}
