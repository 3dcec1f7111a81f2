//! IndexUpdater - incremental index refresh
//!
//! Brings an index's materialized table up to the document store's global
//! sequence. The change feed is consumed in pages; for each page the
//! affected documents' winning revisions are projected outside the writer
//! queue, then the page's deletes, inserts and the `last_sequence`
//! advance commit in one queue transaction. `last_sequence` therefore
//! moves monotonically and a partially applied page is never visible.
//!
//! A document whose winner is deleted, or whose leaves are all deleted,
//! is a tombstone: its rows are removed and nothing is inserted. Purge
//! notifications take the same path for every index at once.

use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, error};

use crate::datastore::DocumentStore;
use crate::db::{DbResult, SqlQueue};

use super::definition::{Index, INDEX_METADATA_TABLE};
use super::errors::{IndexError, IndexResult};
use super::manager::list_indexes_in_database;
use super::projection::project_revision;

/// Revisions consumed from the change feed per transaction
const UPDATE_BATCH_SIZE: usize = 10_000;

/// Refreshes every index in turn.
///
/// Stops at the first failing index; indexes already refreshed keep
/// their progress and the remainder catch up on the next call.
pub(crate) fn update_all(
    indexes: &[Index],
    store: &Arc<dyn DocumentStore>,
    queue: &Arc<SqlQueue>,
) -> IndexResult<()> {
    for index in indexes {
        if let Err(e) = update_index(index, store, queue) {
            error!(index = %index.name, error = %e, "index update failed");
            return Err(e);
        }
    }
    Ok(())
}

/// Refreshes one index identified by name, reading its definition from
/// metadata. A name with no metadata is a no-op.
pub(crate) fn update_index_by_name(
    name: &str,
    store: &Arc<dyn DocumentStore>,
    queue: &Arc<SqlQueue>,
) -> IndexResult<()> {
    let indexes = queue.submit(list_indexes_in_database)?;
    match indexes.into_iter().find(|index| index.name == name) {
        Some(index) => update_index(&index, store, queue),
        None => Ok(()),
    }
}

/// Refreshes one index up to the store's current global sequence.
pub(crate) fn update_index(
    index: &Index,
    store: &Arc<dyn DocumentStore>,
    queue: &Arc<SqlQueue>,
) -> IndexResult<()> {
    let field_names: Vec<String> = index.fields.iter().map(|f| f.field.clone()).collect();
    let delete_sql = format!(
        "DELETE FROM \"{}\" WHERE \"_id\" = ?1",
        index.table_name()
    );
    let insert_sql = insert_statement(&index.table_name(), &field_names);

    loop {
        let Some(since) = current_last_sequence(&index.name, queue)? else {
            // the index was deleted under us
            return Ok(());
        };
        let global = store.last_sequence()?;
        if since >= global {
            return Ok(());
        }

        let batch = store.changes_since(since, UPDATE_BATCH_SIZE)?;
        if batch.last_sequence <= since {
            return Ok(());
        }

        let mut updates: Vec<(String, Vec<Vec<SqlValue>>)> = Vec::with_capacity(batch.doc_ids.len());
        for doc_id in &batch.doc_ids {
            let Some(forest) = store.revision_forest(doc_id)? else {
                continue;
            };
            let rows = match forest.winning_revision() {
                Some(winner) => project_revision(winner, &field_names),
                None => Vec::new(),
            };
            updates.push((doc_id.clone(), rows));
        }

        let batch_last = batch.last_sequence;
        {
            let index_name = index.name.clone();
            let delete_sql = delete_sql.clone();
            let insert_sql = insert_sql.clone();
            queue
                .submit_transaction(move |conn| {
                    apply_batch(conn, &delete_sql, &insert_sql, &updates)?;
                    conn.execute(
                        &format!(
                            "UPDATE {INDEX_METADATA_TABLE} SET last_sequence = ?1 \
                             WHERE index_name = ?2"
                        ),
                        params![batch_last, index_name],
                    )?;
                    Ok(())
                })
                .map_err(IndexError::op_failed(format!(
                    "updating index {}",
                    index.name
                )))?;
        }
        debug!(index = %index.name, last_sequence = batch_last, "index advanced");
    }
}

/// Removes a purged document's rows from every index table.
pub(crate) fn purge_document(doc_id: &str, queue: &Arc<SqlQueue>) -> IndexResult<()> {
    let context = format!("purging document {doc_id} from indexes");
    let doc_id = doc_id.to_string();
    queue
        .submit_transaction(move |conn| {
            for index in list_indexes_in_database(conn)? {
                conn.execute(
                    &format!("DELETE FROM \"{}\" WHERE \"_id\" = ?1", index.table_name()),
                    params![doc_id],
                )?;
            }
            Ok(())
        })
        .map_err(IndexError::op_failed(context))
}

fn apply_batch(
    conn: &Connection,
    delete_sql: &str,
    insert_sql: &str,
    updates: &[(String, Vec<Vec<SqlValue>>)],
) -> DbResult<()> {
    for (doc_id, rows) in updates {
        conn.execute(delete_sql, params![doc_id])?;
        for row in rows {
            conn.execute(insert_sql, params_from_iter(row.iter()))?;
        }
    }
    Ok(())
}

fn insert_statement(table: &str, field_names: &[String]) -> String {
    let columns: Vec<String> = field_names.iter().map(|f| format!("\"{f}\"")).collect();
    let placeholders: Vec<String> = (1..=field_names.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO \"{table}\" ( {} ) VALUES ( {} )",
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn current_last_sequence(name: &str, queue: &Arc<SqlQueue>) -> IndexResult<Option<i64>> {
    let name = name.to_string();
    Ok(queue.submit(move |conn| {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT last_sequence FROM {INDEX_METADATA_TABLE} \
                     WHERE index_name = ?1 LIMIT 1"
                ),
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    })?)
}
