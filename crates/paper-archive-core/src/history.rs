//! History index: an ordered, deduplicated projection of a raw listing.
//!
//! [`build`] is a pure function of the listing. It is re-invoked after every
//! mutating store call rather than patched incrementally, so the index can
//! never drift from out-of-band changes to the archive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::naming::{self, DocumentId, OwnerId, Variant};
use crate::store::ObjectInfo;

/// Read-only projection of one document for listing.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: DocumentId,
    /// Per-variant store revision token, keyed by the variants actually
    /// observed in the listing.
    pub revisions: BTreeMap<Variant, String>,
}

impl HistoryEntry {
    pub fn variants(&self) -> impl Iterator<Item = Variant> + '_ {
        self.revisions.keys().copied()
    }

    pub fn has(&self, variant: Variant) -> bool {
        self.revisions.contains_key(&variant)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.id.created_at_ms).ok()?)
    }
}

/// Build the ordered history for one owner from a raw listing.
///
/// Undecodable keys and keys belonging to other owners are silently skipped;
/// one corrupt historical key must not break the whole listing. Entries are
/// ordered most recent first, ties broken by title ascending for determinism.
pub fn build(listing: &[ObjectInfo], owner: &OwnerId) -> Vec<HistoryEntry> {
    let mut groups: HashMap<DocumentId, BTreeMap<Variant, String>> = HashMap::new();

    for object in listing {
        let Some((id, variant)) = naming::decode(&object.key) else {
            continue;
        };
        if &id.owner != owner {
            continue;
        }
        groups.entry(id).or_default().insert(variant, object.revision.clone());
    }

    let mut entries: Vec<HistoryEntry> = groups
        .into_iter()
        .map(|(id, revisions)| HistoryEntry { id, revisions })
        .collect();

    entries.sort_by(|a, b| {
        b.id.created_at_ms
            .cmp(&a.id.created_at_ms)
            .then_with(|| a.id.title.cmp(&b.id.title))
    });

    entries
}

/// Outcome of deleting a document's artifacts.
///
/// Success is claimed only when every known variant key is confirmed absent.
/// A partial report lists the keys still present so the caller can retry
/// exactly those.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub id: DocumentId,
    /// Keys confirmed absent after this call.
    pub deleted: Vec<String>,
    /// Keys whose delete failed, with the failure reason.
    pub failed: Vec<FailedDelete>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDelete {
    pub key: String,
    pub reason: String,
}

impl DeleteReport {
    pub fn complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn obj(key: &str) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            revision: format!("{:x}", md5::compute(key)),
        }
    }

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    #[test]
    fn test_groups_variants_into_one_entry() {
        let listing = vec![
            obj("u1/paper_100.pdf"),
            obj("u1/paper_100.md"),
            obj("u1/paper_100_dual.md"),
        ];
        let entries = build(&listing, &owner("u1"));
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id.title, "paper");
        assert_eq!(entry.id.created_at_ms, 100);
        assert!(entry.has(Variant::Source));
        assert!(entry.has(Variant::Translation));
        assert!(entry.has(Variant::Dual));
    }

    #[test]
    fn test_ordering_recent_first_title_tiebreak() {
        let listing = vec![
            obj("u1/older_100.pdf"),
            obj("u1/newest_300.pdf"),
            obj("u1/beta_200.pdf"),
            obj("u1/alpha_200.pdf"),
        ];
        let entries = build(&listing, &owner("u1"));
        let order: Vec<_> = entries.iter().map(|e| e.id.title.as_str()).collect();
        assert_eq!(order, ["newest", "alpha", "beta", "older"]);
    }

    #[test]
    fn test_skips_undecodable_and_foreign_keys() {
        let listing = vec![
            obj("u1/paper_100.pdf"),
            obj("u1/README.txt"),
            obj("u1/garbage"),
            obj("u2/other_100.pdf"),
        ];
        let entries = build(&listing, &owner("u1"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.title, "paper");
    }

    #[test]
    fn test_empty_listing() {
        assert!(build(&[], &owner("u1")).is_empty());
    }

    #[test]
    fn test_same_title_different_timestamps_are_distinct() {
        let listing = vec![obj("u1/paper_100.pdf"), obj("u1/paper_200.pdf")];
        let entries = build(&listing, &owner("u1"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.created_at_ms, 200);
        assert_eq!(entries[1].id.created_at_ms, 100);
    }
}
