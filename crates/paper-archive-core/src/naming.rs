//! Canonical artifact naming.
//!
//! Every object in the archive store is addressed by a key of the form
//! `{owner}/{title}_{created_at_ms}{suffix}{ext}`. Existence and variant are
//! encoded entirely in the key string; there is no directory metadata. The
//! codec is a pure encode/decode pair: `decode` is the exact left inverse of
//! `encode` on well-formed keys, and malformed keys decode to `None` so that
//! one corrupt historical key never breaks a whole listing.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Physical artifact kind belonging to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// The uploaded PDF, archived verbatim.
    Source,
    /// Translated markdown (target language only).
    Translation,
    /// Interleaved bilingual markdown.
    Dual,
}

impl Variant {
    /// Key component inserted after the timestamp.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Source | Self::Translation => "",
            Self::Dual => "_dual",
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Source => ".pdf",
            Self::Translation | Self::Dual => ".md",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Source => "application/pdf",
            Self::Translation | Self::Dual => "text/markdown",
        }
    }

    pub const fn all() -> [Self; 3] {
        [Self::Source, Self::Translation, Self::Dual]
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Translation => write!(f, "translation"),
            Self::Dual => write!(f, "dual"),
        }
    }
}

/// Validated owner identifier used as the key prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and wrap an owner id.
    ///
    /// Owner ids become the first path segment of every key, so they must be
    /// non-empty and free of separators and whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.chars().any(|c| c == '/' || c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidOwnerId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listing prefix for this owner's keys.
    pub fn prefix(&self) -> String {
        format!("{}/", self.0)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical document identity: `(owner, title, created_at)`.
///
/// `created_at_ms` is assigned once from the [`MonotonicClock`] at creation
/// and never changes; it is the sole ordering key for listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    pub owner: OwnerId,
    /// Sanitized title; always a fixed point of [`sanitize_title`].
    pub title: String,
    pub created_at_ms: u64,
}

impl DocumentId {
    /// Create an identity with a sanitized title.
    pub fn new(owner: OwnerId, title: &str, created_at_ms: u64) -> Self {
        Self {
            owner,
            title: sanitize_title(title),
            created_at_ms,
        }
    }

    /// Derive the store key for one variant of this document.
    pub fn key(&self, variant: Variant) -> String {
        encode(&self.owner, &self.title, self.created_at_ms, variant)
    }

    /// Keys of every possible variant, whether or not they exist in the store.
    pub fn all_keys(&self) -> Vec<String> {
        Variant::all().iter().map(|v| self.key(*v)).collect()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.title, self.created_at_ms)
    }
}

/// Strip path-unsafe characters and collapse whitespace.
///
/// Unicode titles pass through untouched; only ASCII path metacharacters and
/// control characters are dropped. Whitespace runs collapse to a single `_`.
/// An empty result falls back to `untitled` so the key stays well-formed.
pub fn sanitize_title(title: &str) -> String {
    const UNSAFE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '%'];

    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_whitespace() || c == '_' {
            pending_sep = !out.is_empty();
        } else if !UNSAFE.contains(&c) && !c.is_control() {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(c);
        }
    }

    let out = out.trim_matches(|c| c == '_' || c == '.').to_string();
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// Derive the canonical key for `(owner, title, created_at, variant)`.
///
/// `title` is sanitized on the way in, so encoding is total.
pub fn encode(owner: &OwnerId, title: &str, created_at_ms: u64, variant: Variant) -> String {
    format!(
        "{}/{}_{}{}{}",
        owner.as_str(),
        sanitize_title(title),
        created_at_ms,
        variant.suffix(),
        variant.extension()
    )
}

/// Parse a key back into its identity and variant.
///
/// Returns `None` for anything that `encode` could not have produced: missing
/// owner segment, unknown extension, non-numeric timestamp, or a title that is
/// not a fixed point of [`sanitize_title`].
pub fn decode(key: &str) -> Option<(DocumentId, Variant)> {
    let (owner, file) = key.split_once('/')?;
    let owner = OwnerId::new(owner).ok()?;

    // The dual suffix sits after the timestamp, so `title_123_dual.md` is
    // unambiguous even when the title itself ends in `_dual`.
    let (stem, variant) = if let Some(stem) = file.strip_suffix(".pdf") {
        (stem, Variant::Source)
    } else if let Some(stem) = file.strip_suffix("_dual.md") {
        (stem, Variant::Dual)
    } else if let Some(stem) = file.strip_suffix(".md") {
        (stem, Variant::Translation)
    } else {
        return None;
    };

    let (title, ts) = stem.rsplit_once('_')?;
    if ts.is_empty() || !ts.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let created_at_ms: u64 = ts.parse().ok()?;

    if title.is_empty() || sanitize_title(title) != title {
        return None;
    }

    Some((
        DocumentId {
            owner,
            title: title.to_string(),
            created_at_ms,
        },
        variant,
    ))
}

/// Strictly increasing epoch-millisecond clock.
///
/// Two uploads inside the same millisecond would otherwise collide on the
/// timestamp component and silently overwrite each other, so same-tick calls
/// are bumped forward by one millisecond.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<u64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unique timestamp in epoch milliseconds.
    pub fn now_ms(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        // Mutex poisoning cannot occur: the critical section never panics.
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = wall.max(*last + 1);
        *last = next;
        next
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    #[test]
    fn test_encode_matches_naming_scheme() {
        let o = owner("u1");
        assert_eq!(
            encode(&o, "Attention Is All You Need", 1_700_000_000_000, Variant::Source),
            "u1/Attention_Is_All_You_Need_1700000000000.pdf"
        );
        assert_eq!(
            encode(&o, "Attention Is All You Need", 1_700_000_000_000, Variant::Translation),
            "u1/Attention_Is_All_You_Need_1700000000000.md"
        );
        assert_eq!(
            encode(&o, "Attention Is All You Need", 1_700_000_000_000, Variant::Dual),
            "u1/Attention_Is_All_You_Need_1700000000000_dual.md"
        );
    }

    #[test]
    fn test_decode_is_left_inverse_of_encode() {
        let o = owner("s3");
        for variant in Variant::all() {
            for title in ["Deep Learning", "数学建模 论文", "a_b c", "2024 report"] {
                let key = encode(&o, title, 1_712_345_678_901, variant);
                let (id, v) = decode(&key).unwrap();
                assert_eq!(v, variant, "variant for {key}");
                assert_eq!(id.owner, o);
                assert_eq!(id.title, sanitize_title(title));
                assert_eq!(id.created_at_ms, 1_712_345_678_901);
            }
        }
    }

    #[test]
    fn test_decode_title_ending_in_dual() {
        let o = owner("u1");
        let key = encode(&o, "modes dual", 42, Variant::Translation);
        assert_eq!(key, "u1/modes_dual_42.md");
        let (id, v) = decode(&key).unwrap();
        assert_eq!(v, Variant::Translation);
        assert_eq!(id.title, "modes_dual");
    }

    #[test]
    fn test_decode_rejects_malformed_keys() {
        for key in [
            "",
            "no-slash.pdf",
            "u1/",
            "u1/file.txt",
            "u1/notimestamp.pdf",
            "u1/title_notanumber.md",
            "u1/_123.pdf",
            "u1/ bad title _123.pdf",
            "u1/sub/dir_123.pdf",
        ] {
            assert!(decode(key).is_none(), "expected None for {key:?}");
        }
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Attention Is All You Need"), "Attention_Is_All_You_Need");
        assert_eq!(sanitize_title("  a/b\\c:d  "), "abcd");
        assert_eq!(sanitize_title("tabs\tand\nnewlines"), "tabs_and_newlines");
        assert_eq!(sanitize_title("///"), "untitled");
        assert_eq!(sanitize_title(""), "untitled");
        // Already-sanitized titles are fixed points.
        let s = sanitize_title("Attention Is All You Need");
        assert_eq!(sanitize_title(&s), s);
    }

    #[test]
    fn test_owner_id_validation() {
        assert!(OwnerId::new("s1").is_ok());
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("a/b").is_err());
        assert!(OwnerId::new("a b").is_err());
    }

    #[test]
    fn test_monotonic_clock_never_repeats() {
        let clock = MonotonicClock::new();
        let mut prev = 0;
        for _ in 0..1000 {
            let t = clock.now_ms();
            assert!(t > prev, "{t} must be greater than {prev}");
            prev = t;
        }
    }
}
