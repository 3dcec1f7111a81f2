//! In-memory document store shared by the integration suites.
//!
//! Sequences are assigned in insertion order, the winner is whichever
//! revision was last marked current, and purges publish on the event bus
//! exactly like a real store would.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;

use syncstore::datastore::{
    ChangeBatch, DocumentRevision, DocumentStore, EventBus, RevisionForest, StoreError,
    StoreEvent, StoreResult,
};

pub struct MemoryDocumentStore {
    revisions: Mutex<Vec<DocumentRevision>>,
    bus: EventBus,
    tmp: TempDir,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            revisions: Mutex::new(Vec::new()),
            bus: EventBus::new(),
            tmp: tempfile::tempdir().expect("temp dir for store extensions"),
        }
    }

    /// Next unused sequence number.
    pub fn next_sequence(&self) -> i64 {
        self.revisions
            .lock()
            .unwrap()
            .last()
            .map(|rev| rev.sequence)
            .unwrap_or(0)
            + 1
    }

    /// Appends a raw revision. When it is marked current, the flag is
    /// cleared on every other revision of the same document.
    pub fn add_revision(&self, revision: DocumentRevision) {
        let mut revisions = self.revisions.lock().unwrap();
        if revision.current {
            for existing in revisions
                .iter_mut()
                .filter(|rev| rev.doc_id == revision.doc_id)
            {
                existing.current = false;
            }
        }
        revisions.push(revision);
    }

    /// Creates generation 1 of a document, marked current. Returns the
    /// assigned sequence.
    pub fn create_document(&self, doc_id: &str, rev_id: &str, body: Value) -> i64 {
        let sequence = self.next_sequence();
        self.add_revision(
            DocumentRevision::new(doc_id, rev_id, sequence, 0)
                .with_body(body)
                .with_current(true),
        );
        sequence
    }

    /// Adds a child revision, marked current. Returns the assigned
    /// sequence.
    pub fn update_document(
        &self,
        doc_id: &str,
        parent_sequence: i64,
        rev_id: &str,
        body: Value,
    ) -> i64 {
        let sequence = self.next_sequence();
        self.add_revision(
            DocumentRevision::new(doc_id, rev_id, sequence, parent_sequence)
                .with_body(body)
                .with_current(true),
        );
        sequence
    }

    /// Adds a current tombstone revision. Returns the assigned sequence.
    pub fn delete_document(&self, doc_id: &str, parent_sequence: i64, rev_id: &str) -> i64 {
        let sequence = self.next_sequence();
        self.add_revision(
            DocumentRevision::new(doc_id, rev_id, sequence, parent_sequence)
                .with_deleted(true)
                .with_current(true),
        );
        sequence
    }

    /// Physically removes a document and publishes the purge event.
    pub fn purge_document(&self, doc_id: &str) {
        let purged_rev_ids: Vec<String> = {
            let mut revisions = self.revisions.lock().unwrap();
            let purged = revisions
                .iter()
                .filter(|rev| rev.doc_id == doc_id)
                .map(|rev| rev.rev_id.clone())
                .collect();
            revisions.retain(|rev| rev.doc_id != doc_id);
            purged
        };
        self.bus.publish(&StoreEvent::DocumentPurged {
            doc_id: doc_id.to_string(),
            purged_rev_ids,
        });
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn last_sequence(&self) -> StoreResult<i64> {
        Ok(self
            .revisions
            .lock()
            .unwrap()
            .last()
            .map(|rev| rev.sequence)
            .unwrap_or(0))
    }

    fn changes_since(&self, since: i64, limit: usize) -> StoreResult<ChangeBatch> {
        let revisions = self.revisions.lock().unwrap();
        let mut last_sequence = since;
        let mut doc_ids: Vec<String> = Vec::new();

        for revision in revisions
            .iter()
            .filter(|rev| rev.sequence > since)
            .take(limit)
        {
            last_sequence = revision.sequence;
            if !doc_ids.contains(&revision.doc_id) {
                doc_ids.push(revision.doc_id.clone());
            }
        }

        Ok(ChangeBatch {
            last_sequence,
            doc_ids,
        })
    }

    fn revision_forest(&self, doc_id: &str) -> StoreResult<Option<RevisionForest>> {
        let revisions = self.revisions.lock().unwrap();
        let mut forest = RevisionForest::new();
        let mut found = false;

        // insertion order is ascending sequence, so parents precede
        // children
        for revision in revisions.iter().filter(|rev| rev.doc_id == doc_id) {
            forest
                .add(revision.clone())
                .map_err(|e| StoreError::with_source("malformed revision history", e))?;
            found = true;
        }

        Ok(found.then_some(forest))
    }

    fn revision(&self, doc_id: &str, rev_id: &str) -> StoreResult<Option<DocumentRevision>> {
        Ok(self
            .revisions
            .lock()
            .unwrap()
            .iter()
            .find(|rev| rev.doc_id == doc_id && rev.rev_id == rev_id)
            .cloned())
    }

    fn extension_dir(&self, extension: &str) -> PathBuf {
        self.tmp.path().join("extensions").join(extension)
    }

    fn event_bus(&self) -> &EventBus {
        &self.bus
    }
}
