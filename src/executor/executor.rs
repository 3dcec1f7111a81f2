//! Query execution
//!
//! Execution flow, in order:
//!
//! 1. Translate each planned scan to one SQL statement and run it on
//!    the writer queue
//! 2. Deduplicate each scan's rows by `_id` (array fan-out stores more
//!    than one row per document)
//! 3. Intersect the scans by `_id`, keeping the first scan's order
//! 4. Sort: covered sorts already ran as ORDER BY; anything else is an
//!    in-memory post-sort over winner bodies
//! 5. Apply `skip` and `limit` (0 means unlimited)
//! 6. Hand the ordered `(_id, _rev)` pairs to `QueryResult`

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params_from_iter;
use serde_json::Value;

use crate::datastore::DocumentStore;
use crate::db::SqlQueue;
use crate::index::{FieldSort, IndexResult};
use crate::planner::QueryPlan;

use super::result::QueryResult;
use super::sorter::sort_matches;
use super::translate::scan_statement;

/// Paging, projection and ordering options for one `find` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions<'a> {
    /// Matches to drop from the front of the result
    pub skip: usize,
    /// Maximum matches to return; 0 means unlimited
    pub limit: usize,
    /// Top-level body members to keep in returned revisions
    pub fields: Option<&'a [String]>,
    /// Requested result order
    pub sort: Option<&'a [FieldSort]>,
}

/// Runs a plan and produces the query result.
pub(crate) fn execute(
    plan: &QueryPlan,
    options: &FindOptions<'_>,
    queue: &Arc<SqlQueue>,
    store: &Arc<dyn DocumentStore>,
) -> IndexResult<QueryResult> {
    let order_by = match options.sort {
        Some(sort) if !sort.is_empty() && plan.covered_sort && plan.scans.len() == 1 => Some(sort),
        _ => None,
    };

    let mut scan_results = Vec::with_capacity(plan.scans.len());
    for scan in &plan.scans {
        let statement = scan_statement(scan, order_by)?;
        let rows: Vec<(String, String)> = queue.submit(move |conn| {
            let mut stmt = conn.prepare(&statement.sql)?;
            let mapped = stmt.query_map(params_from_iter(statement.params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            Ok(mapped.collect::<Result<Vec<_>, _>>()?)
        })?;
        scan_results.push(dedup_by_doc(rows));
    }

    let mut matches = intersect(scan_results);

    if let Some(sort) = options.sort {
        if !sort.is_empty() && order_by.is_none() {
            matches = post_sort(matches, sort, store)?;
        }
    }

    let matches = page(matches, options.skip, options.limit);
    Ok(QueryResult::new(
        matches,
        Arc::clone(store),
        options.fields.map(<[String]>::to_vec),
    ))
}

/// Keeps the first row per document id, preserving order.
fn dedup_by_doc(rows: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|(doc_id, _)| seen.insert(doc_id.clone()))
        .collect()
}

/// Intersects scans by document id, keeping the first scan's order.
fn intersect(mut scans: Vec<Vec<(String, String)>>) -> Vec<(String, String)> {
    if scans.is_empty() {
        return Vec::new();
    }
    let first = scans.remove(0);
    if scans.is_empty() {
        return first;
    }

    let others: Vec<HashSet<String>> = scans
        .into_iter()
        .map(|rows| rows.into_iter().map(|(doc_id, _)| doc_id).collect())
        .collect();
    first
        .into_iter()
        .filter(|(doc_id, _)| others.iter().all(|ids| ids.contains(doc_id)))
        .collect()
}

/// Sorts matches in memory against winner bodies from the store.
fn post_sort(
    matches: Vec<(String, String)>,
    sort: &[FieldSort],
    store: &Arc<dyn DocumentStore>,
) -> IndexResult<Vec<(String, String)>> {
    let mut keyed = Vec::with_capacity(matches.len());
    for (doc_id, rev_id) in matches {
        let body = store
            .revision(&doc_id, &rev_id)?
            .map(|rev| rev.body)
            .unwrap_or(Value::Null);
        keyed.push(((doc_id, rev_id), body));
    }
    sort_matches(&mut keyed, sort);
    Ok(keyed.into_iter().map(|(pair, _)| pair).collect())
}

fn page(matches: Vec<(String, String)>, skip: usize, limit: usize) -> Vec<(String, String)> {
    let remaining = matches.into_iter().skip(skip);
    if limit == 0 {
        remaining.collect()
    } else {
        remaining.take(limit).collect()
    }
}
