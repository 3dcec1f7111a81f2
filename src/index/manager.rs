//! IndexManager - lifecycle and metadata of secondary indexes
//!
//! The manager owns the index database (opened in the document store's
//! extension folder), the single-writer queue over it and the one-time
//! FTS capability probe. It is the entry point for:
//!
//! - `list_indexes` - assemble index definitions from metadata rows
//! - `ensure_indexed` - create an index, idempotently
//! - `delete_index` - drop an index's table and metadata together
//! - `update_all_indexes` - incremental refresh from the change feed
//! - `find` - refresh, plan and execute a structured query
//!
//! The manager subscribes to the store's event bus so purged documents
//! vanish from every index, and unsubscribes again on close.

use std::sync::Arc;

use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::{info, warn};

use crate::datastore::{DocumentStore, StoreEvent, Subscription};
use crate::db::{apply_migrations, DbResult, Migration, SqlQueue};
use crate::executor::{self, FindOptions, QueryResult};
use crate::planner::{plan_query, Selector};

use super::creator::{self, CandidateIndex};
use super::definition::{
    table_name_for_index, FieldSort, Index, IndexSettings, IndexType, EXTENSION_NAME,
    FTS_CHECK_TABLE, INDEX_DB_FILE, INDEX_METADATA_TABLE,
};
use super::errors::{IndexError, IndexResult};
use super::updater;

/// Metadata schema, applied at open. v1 is the original layout; v2 adds
/// the settings blob.
pub(crate) const SCHEMA_MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        statements: &[
            "CREATE TABLE _t_cloudant_sync_query_metadata ( \
             index_name TEXT NOT NULL, \
             index_type TEXT NOT NULL, \
             field_name TEXT NOT NULL, \
             last_sequence INTEGER NOT NULL, \
             PRIMARY KEY (index_name, field_name) )",
        ],
    },
    Migration {
        version: 2,
        statements: &["ALTER TABLE _t_cloudant_sync_query_metadata ADD COLUMN index_settings TEXT"],
    },
];

/// Process-wide service maintaining queryable projections of winning
/// revisions in an embedded SQLite database.
pub struct IndexManager {
    store: Arc<dyn DocumentStore>,
    queue: Arc<SqlQueue>,
    text_search_enabled: bool,
    purge_subscription: Option<Subscription>,
}

impl IndexManager {
    /// Opens (creating when necessary) the index database for a document
    /// store, applies schema migrations, probes FTS support and registers
    /// for purge notifications.
    pub fn open(store: Arc<dyn DocumentStore>) -> IndexResult<Self> {
        let dir = store.extension_dir(EXTENSION_NAME);
        std::fs::create_dir_all(&dir).map_err(|source| IndexError::Io {
            path: dir.clone(),
            source,
        })?;

        let queue = Arc::new(SqlQueue::open(dir.join(INDEX_DB_FILE))?);
        queue.submit(|conn| apply_migrations(conn, &SCHEMA_MIGRATIONS))?;

        let text_search_enabled = fts_available(&queue);
        if !text_search_enabled {
            info!("text search is not supported by this storage engine");
        }

        let purge_queue = Arc::clone(&queue);
        let purge_subscription = store.event_bus().subscribe(move |event| match event {
            StoreEvent::DocumentPurged { doc_id, .. } => {
                if let Err(e) = updater::purge_document(doc_id, &purge_queue) {
                    warn!(doc = %doc_id, error = %e, "failed to remove purged document from indexes");
                }
            }
        });

        Ok(Self {
            store,
            queue,
            text_search_enabled,
            purge_subscription: Some(purge_subscription),
        })
    }

    /// Lists every index and its definition.
    pub fn list_indexes(&self) -> IndexResult<Vec<Index>> {
        Ok(self.queue.submit(list_indexes_in_database)?)
    }

    /// Creates a json index over `fields` with a generated name.
    ///
    /// Returns the name; calling again with an equivalent definition is a
    /// no-op returning the same name.
    pub fn ensure_indexed(&self, fields: &[FieldSort]) -> IndexResult<String> {
        self.ensure_indexed_with(fields, None, IndexType::Json, None)
    }

    /// Creates a named json index over `fields`.
    pub fn ensure_indexed_named(&self, fields: &[FieldSort], name: &str) -> IndexResult<String> {
        self.ensure_indexed_with(fields, Some(name), IndexType::Json, None)
    }

    /// Creates an index with full control over name, kind and tokenizer.
    pub fn ensure_indexed_with(
        &self,
        fields: &[FieldSort],
        name: Option<&str>,
        index_type: IndexType,
        tokenize: Option<&str>,
    ) -> IndexResult<String> {
        creator::ensure_indexed(
            CandidateIndex {
                fields: fields.to_vec(),
                name: name.map(str::to_string),
                index_type,
                tokenize: tokenize.map(str::to_string),
            },
            &self.store,
            &self.queue,
            self.text_search_enabled,
        )
    }

    /// Deletes an index: its metadata rows and its table go together in
    /// one transaction, metadata first.
    pub fn delete_index(&self, name: &str) -> IndexResult<()> {
        if name.is_empty() {
            return Err(IndexError::InvalidArgument(
                "to delete an index, its name must be provided".to_string(),
            ));
        }

        let context = format!("deleting index {name}");
        let name = name.to_string();
        self.queue
            .submit_transaction(move |conn| {
                conn.execute(
                    &format!("DELETE FROM {INDEX_METADATA_TABLE} WHERE index_name = ?1"),
                    params![name],
                )?;
                conn.execute(
                    &format!("DROP TABLE \"{}\"", table_name_for_index(&name)),
                    [],
                )?;
                Ok(())
            })
            .map_err(IndexError::op_failed(context))
    }

    /// Brings every index up to the store's current global sequence.
    pub fn update_all_indexes(&self) -> IndexResult<()> {
        let indexes = self.list_indexes()?;
        updater::update_all(&indexes, &self.store, &self.queue)
    }

    /// Runs a structured query with default paging and projection.
    pub fn find(&self, query: &Value) -> IndexResult<QueryResult> {
        self.find_with(query, 0, 0, None, None)
    }

    /// Runs a structured query.
    ///
    /// Indexes refresh first, so results reflect the store's current
    /// winners. `limit` of 0 means unlimited. `fields` projects returned
    /// bodies to the named top-level members.
    pub fn find_with(
        &self,
        query: &Value,
        skip: usize,
        limit: usize,
        fields: Option<&[String]>,
        sort: Option<&[FieldSort]>,
    ) -> IndexResult<QueryResult> {
        self.update_all_indexes()?;
        let indexes = self.list_indexes()?;

        let selector = Selector::parse(query)?;
        let plan = plan_query(&selector, &indexes, sort)?;

        executor::execute(
            &plan,
            &FindOptions {
                skip,
                limit,
                fields,
                sort,
            },
            &self.queue,
            &self.store,
        )
    }

    /// Result of the one-time FTS capability probe.
    pub fn is_text_search_enabled(&self) -> bool {
        self.text_search_enabled
    }

    /// Unregisters from the event bus and drains the writer queue.
    pub fn close(&mut self) {
        if let Some(subscription) = self.purge_subscription.take() {
            self.store.event_bus().unsubscribe(subscription);
        }
        self.queue.shutdown();
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Assembles index definitions from the metadata table.
///
/// Field order within an index follows row insertion order; the kind,
/// settings and sequence are taken from the first row of each index.
pub(crate) fn list_indexes_in_database(conn: &Connection) -> DbResult<Vec<Index>> {
    let mut names_stmt = conn.prepare(&format!(
        "SELECT DISTINCT index_name FROM {INDEX_METADATA_TABLE} ORDER BY index_name"
    ))?;
    let names: Vec<String> = names_stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let mut rows_stmt = conn.prepare(&format!(
        "SELECT index_type, field_name, last_sequence, index_settings \
         FROM {INDEX_METADATA_TABLE} WHERE index_name = ?1 ORDER BY rowid"
    ))?;

    let mut indexes = Vec::with_capacity(names.len());
    for name in names {
        let mut index_type: Option<IndexType> = None;
        let mut settings_blob: Option<String> = None;
        let mut last_sequence = 0;
        let mut fields = Vec::new();

        let rows = rows_stmt.query_map(params![name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        for row in rows {
            let (kind, field, sequence, blob) = row?;
            if index_type.is_none() {
                index_type = IndexType::parse(&kind);
                settings_blob = blob;
                last_sequence = sequence;
            }
            fields.push(FieldSort::ascending(field));
        }

        // rows with an unrecognized kind are unusable; skip them
        let Some(index_type) = index_type else {
            continue;
        };
        indexes.push(Index {
            name,
            index_type,
            fields,
            settings: IndexSettings::from_json(settings_blob.as_deref()),
            last_sequence,
        });
    }
    Ok(indexes)
}

/// Probes FTS support by creating and dropping a virtual table inside a
/// rolled-together transaction. Any failure means no text search.
fn fts_available(queue: &Arc<SqlQueue>) -> bool {
    queue
        .submit_transaction(|conn| {
            conn.execute(
                &format!("CREATE VIRTUAL TABLE \"{FTS_CHECK_TABLE}\" USING FTS4 ( col )"),
                [],
            )?;
            conn.execute(&format!("DROP TABLE \"{FTS_CHECK_TABLE}\""), [])?;
            Ok(())
        })
        .is_ok()
}
