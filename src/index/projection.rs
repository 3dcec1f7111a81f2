//! Projection of a winning revision onto an index's field list
//!
//! Each indexed field contributes one column value per row. Scalars map
//! directly, a missing field or an object projects as NULL, and an array
//! fans out into one row per scalar element. Multiple array-valued fields
//! multiply out (cartesian product across the fanned-out fields).

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::datastore::DocumentRevision;

/// Resolves a dotted path against a JSON body, descending objects only.
pub(crate) fn extract_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = body;
    for segment in path.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

/// Maps a scalar JSON value onto a SQLite column value.
///
/// Booleans are stored as 0/1; objects and arrays have no scalar
/// representation and store NULL.
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Null,
    }
}

/// Projects a winning revision onto an ordered field list.
///
/// Returns the rows to insert into the index table, one column value per
/// field in field order. `_id` and `_rev` resolve from the revision
/// itself, never from the body.
pub(crate) fn project_revision(revision: &DocumentRevision, fields: &[String]) -> Vec<Vec<SqlValue>> {
    let columns: Vec<Vec<SqlValue>> = fields
        .iter()
        .map(|field| match field.as_str() {
            "_id" => vec![SqlValue::Text(revision.doc_id.clone())],
            "_rev" => vec![SqlValue::Text(revision.rev_id.clone())],
            path => match extract_path(&revision.body, path) {
                None => vec![SqlValue::Null],
                Some(Value::Array(items)) => {
                    if items.is_empty() {
                        vec![SqlValue::Null]
                    } else {
                        items.iter().map(to_sql_value).collect()
                    }
                }
                Some(value) => vec![to_sql_value(value)],
            },
        })
        .collect();

    // cartesian product across the per-field value lists
    let mut rows: Vec<Vec<SqlValue>> = vec![Vec::with_capacity(fields.len())];
    for column in columns {
        let mut expanded = Vec::with_capacity(rows.len() * column.len());
        for row in &rows {
            for value in &column {
                let mut next = row.clone();
                next.push(value.clone());
                expanded.push(next);
            }
        }
        rows = expanded;
    }
    rows
}
