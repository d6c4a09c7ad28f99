//! OCR output scrubbing.
//!
//! Raw OCR markdown arrives with escaped HTML entities inside formulas,
//! malformed array environments, page-number boilerplate and broken table-of-
//! contents leaders. Everything here is applied before the text is archived
//! or handed to the translator. Inlined base64 images are vaulted first so
//! the line-oriented regexes never touch (or choke on) megabyte-long data
//! URIs.

use regex::Regex;
use std::sync::LazyLock;

static INLINE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(data:image/[^)]*\)").expect("valid regex"));

static ARRAY_OPTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\begin\{array\}\s*\[.*?\]").expect("valid regex"));

static TEAM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Team\s*#?\s*\d+\s*.*$").expect("valid regex"));

static PAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Page\s+\d+(?:\s+of\s+\d+)?\s*.*$").expect("valid regex"));

static TOC_SPLIT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(\d+\.[\d.]*.*)\n+(\d+)$").expect("valid regex"));

static TOC_LEADERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{3,}\s*(\d+)").expect("valid regex"));

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Scrub one page of OCR markdown.
pub fn scrub(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    // Vault inline images before any line-level processing.
    let mut images: Vec<String> = Vec::new();
    let mut text = INLINE_IMAGE
        .replace_all(content, |caps: &regex::Captures<'_>| {
            images.push(caps[0].to_string());
            format!("[[__IMG_TMP_{}__]]", images.len() - 1)
        })
        .into_owned();

    // HTML entity repair inside formulas; double-escaped forms first.
    for (from, to) in [
        ("&amp;lt;", "<"),
        ("&lt;", "<"),
        ("&amp;gt;", ">"),
        ("&gt;", ">"),
        ("&amp;le;", r"\le"),
        ("&le;", r"\le"),
        ("&amp;ge;", r"\ge"),
        ("&ge;", r"\ge"),
        ("&amp;plusmn;", r"\pm"),
        ("&plusmn;", r"\pm"),
    ] {
        text = text.replace(from, to);
    }

    // OCR emits `\begin{array}[...]` option blocks that LaTeX renderers reject.
    text = ARRAY_OPTIONS.replace_all(&text, r"\begin{array}").into_owned();
    text = text.replace("[]{cccccc}", "{cccccc}");

    // Boilerplate lines: team banners and page footers.
    text = TEAM_LINE.replace_all(&text, "").into_owned();
    text = PAGE_LINE.replace_all(&text, "").into_owned();
    text = text.replace(['↪', '\u{21aa}'], "");

    // Pull page numbers the OCR split onto their own line back up, then
    // collapse dotted TOC leaders.
    text = TOC_SPLIT_NUMBER.replace_all(&text, "$1 $2").into_owned();
    text = TOC_LEADERS.replace_all(&text, " $1").into_owned();

    text = BLANK_RUNS.replace_all(&text, "\n\n").into_owned();

    // Restore vaulted images.
    for (i, raw) in images.iter().enumerate() {
        text = text.replace(&format!("[[__IMG_TMP_{i}__]]"), raw);
    }

    text.trim().to_string()
}

/// Heuristic: at least three lines shaped like `Title ... 12` mark a table of
/// contents. Used by the translation batcher to keep TOC sections intact.
pub fn is_likely_toc(text: &str) -> bool {
    static TOC_LINE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[^\n]{5,}\s\d+$").expect("valid regex"));
    TOC_LINE.find_iter(text).count() >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_repair() {
        assert_eq!(scrub("$x &lt; y$"), "$x < y$");
        assert_eq!(scrub("$a &amp;le; b$"), r"$a \le b$");
        assert_eq!(scrub("$p &plusmn; q$"), r"$p \pm q$");
    }

    #[test]
    fn test_array_options_removed() {
        assert_eq!(
            scrub("$$\\begin{array}[t]{cc} a & b \\end{array}$$"),
            "$$\\begin{array}{cc} a & b \\end{array}$$"
        );
    }

    #[test]
    fn test_boilerplate_lines_removed() {
        let scrubbed = scrub("Intro text\nTeam # 2425\nPage 3 of 25\nMore text");
        assert!(!scrubbed.contains("Team"));
        assert!(!scrubbed.contains("Page 3"));
        assert!(scrubbed.contains("Intro text"));
        assert!(scrubbed.contains("More text"));
    }

    #[test]
    fn test_toc_leaders_collapsed() {
        assert_eq!(scrub("Introduction ......... 4"), "Introduction 4");
    }

    #[test]
    fn test_blank_runs_compressed() {
        assert_eq!(scrub("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_inline_images_survive() {
        let input = "before\n\n![image](data:image/jpeg;base64,AAAA....1)\n\nafter ... 12";
        let scrubbed = scrub(input);
        assert!(scrubbed.contains("![image](data:image/jpeg;base64,AAAA....1)"));
        assert!(scrubbed.contains("after 12"));
    }

    #[test]
    fn test_is_likely_toc() {
        let toc = "Introduction 4\nProblem Restatement 5\nModel Overview 7\nResults 12";
        assert!(is_likely_toc(toc));
        assert!(!is_likely_toc("Just a normal paragraph of prose."));
    }
}
