//! DocumentStore - interface to the persistent document body store
//!
//! The body store, its schema migrations and its write path live outside
//! this crate. The index machinery needs four things from it: the global
//! sequence cursor, a paged change feed, per-document revision forests and
//! body lookup by `(doc_id, rev_id)`.

use std::path::PathBuf;

use super::errors::StoreResult;
use super::events::EventBus;
use super::forest::RevisionForest;
use super::revision::DocumentRevision;

/// One page of the store's change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    /// The highest sequence number consumed by this batch
    pub last_sequence: i64,
    /// Ids of documents with a revision in `(since, last_sequence]`,
    /// in ascending sequence order, deduplicated
    pub doc_ids: Vec<String>,
}

impl ChangeBatch {
    /// Returns true if the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }
}

/// The document store collaborator.
///
/// Implementations must assign sequence numbers monotonically; the change
/// feed is the contract the incremental index updater is built on.
pub trait DocumentStore: Send + Sync {
    /// The sequence number of the most recent revision in the store.
    fn last_sequence(&self) -> StoreResult<i64>;

    /// Documents changed after `since`, limited to `limit` revisions.
    ///
    /// The returned `last_sequence` never exceeds the global cursor and
    /// advances past `since` whenever changes exist.
    fn changes_since(&self, since: i64, limit: usize) -> StoreResult<ChangeBatch>;

    /// The revision forest for a document, `None` for an unknown id.
    fn revision_forest(&self, doc_id: &str) -> StoreResult<Option<RevisionForest>>;

    /// A single revision with its body, `None` when absent.
    fn revision(&self, doc_id: &str, rev_id: &str) -> StoreResult<Option<DocumentRevision>>;

    /// The data folder reserved for the named extension.
    fn extension_dir(&self, extension: &str) -> PathBuf;

    /// The store's event bus, carrying purge notifications.
    fn event_bus(&self) -> &EventBus;
}
