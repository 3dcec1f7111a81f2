//! DocumentRevision - one version of a document
//!
//! A revision id has the form `<generation>-<opaque>`. The generation
//! increases by one along every parent to child edge, so revisions with
//! equal generation on different branches carry distinct opaque suffixes.
//!
//! The natural order over revisions is by generation, then by revision id
//! lexicographically. Sequence numbers are assigned by the local store and
//! are not comparable across stores.

use std::cmp::Ordering;

use serde_json::Value;

/// An immutable revision of a single document.
///
/// `sequence` is the store-assigned, globally unique insertion order.
/// `parent` is the sequence of the parent revision; a non-positive value
/// marks a root. At most one revision per document carries `current`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRevision {
    /// Document id
    pub doc_id: String,
    /// Revision id, `<generation>-<opaque>`
    pub rev_id: String,
    /// Store-assigned sequence number
    pub sequence: i64,
    /// Parent sequence number, non-positive for roots
    pub parent: i64,
    /// Tombstone flag
    pub deleted: bool,
    /// Winner flag chosen by the store's winner-picking policy
    pub current: bool,
    /// Document body
    pub body: Value,
}

impl DocumentRevision {
    /// Creates a live, non-current revision with a null body.
    pub fn new(
        doc_id: impl Into<String>,
        rev_id: impl Into<String>,
        sequence: i64,
        parent: i64,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            rev_id: rev_id.into(),
            sequence,
            parent,
            deleted: false,
            current: false,
            body: Value::Null,
        }
    }

    /// Sets the document body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Sets the tombstone flag.
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Sets the current flag.
    pub fn with_current(mut self, current: bool) -> Self {
        self.current = current;
        self
    }

    /// Returns true if this revision roots a tree.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent <= 0
    }

    /// The generation parsed from the revision id prefix.
    ///
    /// Returns 0 for a malformed revision id.
    pub fn generation(&self) -> u64 {
        self.rev_id
            .split_once('-')
            .and_then(|(prefix, _)| prefix.parse().ok())
            .unwrap_or(0)
    }

    /// Natural revision order: generation, then revision id.
    pub fn revision_order(&self, other: &DocumentRevision) -> Ordering {
        self.generation()
            .cmp(&other.generation())
            .then_with(|| self.rev_id.cmp(&other.rev_id))
    }
}
