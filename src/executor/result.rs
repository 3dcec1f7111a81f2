//! Query result container
//!
//! A result holds the ordered `(_id, _rev)` pairs the index scans
//! produced; the revisions themselves materialize lazily, one body
//! lookup per iterated item, so consuming only the ids costs no body
//! loads at all.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::datastore::{DocumentRevision, DocumentStore, StoreError};
use crate::index::IndexResult;

/// The outcome of a `find` call.
pub struct QueryResult {
    matches: Vec<(String, String)>,
    store: Arc<dyn DocumentStore>,
    projection: Option<Vec<String>>,
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("matches", &self.matches)
            .field("projection", &self.projection)
            .finish()
    }
}

impl QueryResult {
    pub(crate) fn new(
        matches: Vec<(String, String)>,
        store: Arc<dyn DocumentStore>,
        projection: Option<Vec<String>>,
    ) -> Self {
        Self {
            matches,
            store,
            projection,
        }
    }

    /// Number of matching documents.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matching document ids in result order.
    pub fn document_ids(&self) -> Vec<String> {
        self.matches.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Lazily materialized matching revisions, in result order.
    ///
    /// Each item joins back to the document store on `(_id, _rev)`; a
    /// revision that vanished between query and iteration surfaces as an
    /// error for that item.
    pub fn revisions(&self) -> impl Iterator<Item = IndexResult<DocumentRevision>> + '_ {
        self.matches.iter().map(move |(doc_id, rev_id)| {
            let revision = self.store.revision(doc_id, rev_id)?.ok_or_else(|| {
                StoreError::new(format!(
                    "revision {rev_id} of document {doc_id} is no longer in the store"
                ))
            })?;
            Ok(match &self.projection {
                Some(fields) => project_fields(revision, fields),
                None => revision,
            })
        })
    }
}

/// Restricts a revision body to the named top-level members.
fn project_fields(mut revision: DocumentRevision, fields: &[String]) -> DocumentRevision {
    if let Value::Object(body) = &revision.body {
        let mut projected = Map::new();
        for field in fields {
            if let Some(value) = body.get(field) {
                projected.insert(field.clone(), value.clone());
            }
        }
        revision.body = Value::Object(projected);
    }
    revision
}
