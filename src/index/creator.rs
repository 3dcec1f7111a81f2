//! IndexCreator - the ensure-indexed state machine
//!
//! Creation steps, in order:
//!
//! 1. Validate the requested kind, tokenizer and field paths
//! 2. Normalize: prepend `_id`/`_rev`, settle the index name
//! 3. Examine existing metadata: an equivalent definition is an
//!    idempotent success, a different one under the same name is a
//!    conflict
//! 4. Create the physical table, its covering index and the metadata
//!    rows in one transaction
//! 5. Seed the new index from the document store
//!
//! The seed runs outside the creation transaction; when it fails the
//! index exists empty and valid, and the next update pass populates it.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params;
use tracing::warn;

use crate::datastore::DocumentStore;
use crate::db::SqlQueue;

use super::definition::{
    generated_index_name, table_name_for_index, valid_field_path, valid_index_name, FieldSort,
    IndexSettings, IndexType, DEFAULT_TOKENIZER, INDEX_METADATA_TABLE,
};
use super::errors::{IndexError, IndexResult};
use super::manager::list_indexes_in_database;
use super::updater;

/// A requested index before validation and normalization.
#[derive(Debug, Clone)]
pub(crate) struct CandidateIndex {
    pub fields: Vec<FieldSort>,
    pub name: Option<String>,
    pub index_type: IndexType,
    pub tokenize: Option<String>,
}

enum Examined {
    Equivalent,
    Conflict,
    Created,
}

pub(crate) fn ensure_indexed(
    candidate: CandidateIndex,
    store: &Arc<dyn DocumentStore>,
    queue: &Arc<SqlQueue>,
    text_search_enabled: bool,
) -> IndexResult<String> {
    validate(&candidate)?;

    if candidate.index_type == IndexType::Text && !text_search_enabled {
        return Err(IndexError::TextSearchUnavailable);
    }

    let settings = match candidate.index_type {
        IndexType::Json => IndexSettings::default(),
        IndexType::Text => IndexSettings {
            tokenize: Some(
                candidate
                    .tokenize
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOKENIZER.to_string()),
            ),
        },
    };

    let name = match &candidate.name {
        Some(name) => {
            if !valid_index_name(name) {
                return Err(IndexError::InvalidArgument(format!(
                    "index name {name:?} does not match the identifier pattern"
                )));
            }
            name.clone()
        }
        None => generated_index_name(
            &candidate.fields,
            candidate.index_type,
            settings.tokenize.as_deref(),
        ),
    };

    let fields = normalize_fields(candidate.fields);
    let index_type = candidate.index_type;

    let outcome = {
        let context = format!("creating index {name}");
        let name = name.clone();
        let fields = fields.clone();
        let settings = settings.clone();
        queue
            .submit_transaction(move |conn| {
                let existing = list_indexes_in_database(conn)?;
                if let Some(existing) = existing.iter().find(|index| index.name == name) {
                    return Ok(
                        if existing.definition_matches(index_type, &fields, &settings) {
                            Examined::Equivalent
                        } else {
                            Examined::Conflict
                        },
                    );
                }

                let table = table_name_for_index(&name);
                let columns: Vec<String> =
                    fields.iter().map(|f| format!("\"{}\"", f.field)).collect();
                let column_list = columns.join(", ");

                match index_type {
                    IndexType::Json => {
                        conn.execute(
                            &format!("CREATE TABLE \"{table}\" ( {column_list} )"),
                            [],
                        )?;
                        conn.execute(
                            &format!(
                                "CREATE INDEX \"{table}_index\" ON \"{table}\" ( {column_list} )"
                            ),
                            [],
                        )?;
                    }
                    IndexType::Text => {
                        let tokenize = settings
                            .tokenize
                            .as_deref()
                            .unwrap_or(DEFAULT_TOKENIZER)
                            .to_string();
                        conn.execute(
                            &format!(
                                "CREATE VIRTUAL TABLE \"{table}\" USING FTS4 ( {column_list}, tokenize={tokenize} )"
                            ),
                            [],
                        )?;
                    }
                }

                let settings_blob = settings.to_json();
                for field in &fields {
                    conn.execute(
                        &format!(
                            "INSERT INTO {INDEX_METADATA_TABLE} \
                             (index_name, index_type, field_name, last_sequence, index_settings) \
                             VALUES (?1, ?2, ?3, 0, ?4)"
                        ),
                        params![name, index_type.as_str(), field.field, settings_blob],
                    )?;
                }

                Ok(Examined::Created)
            })
            .map_err(IndexError::op_failed(context))?
    };

    match outcome {
        Examined::Equivalent => Ok(name),
        Examined::Conflict => Err(IndexError::IndexExists { name }),
        Examined::Created => {
            if let Err(e) = updater::update_index_by_name(&name, store, queue) {
                warn!(index = %name, error = %e, "initial index update failed; the index is empty until the next refresh");
            }
            Ok(name)
        }
    }
}

fn validate(candidate: &CandidateIndex) -> IndexResult<()> {
    if candidate.fields.is_empty() {
        return Err(IndexError::InvalidArgument(
            "an index needs at least one field".to_string(),
        ));
    }

    if candidate.index_type == IndexType::Json && candidate.tokenize.is_some() {
        return Err(IndexError::InvalidArgument(
            "a tokenizer can only be set on a text index".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in &candidate.fields {
        if !valid_field_path(&field.field) {
            return Err(IndexError::InvalidArgument(format!(
                "field {:?} does not match the field name pattern",
                field.field
            )));
        }
        if !seen.insert(field.field.as_str()) {
            return Err(IndexError::InvalidArgument(format!(
                "field {:?} appears more than once",
                field.field
            )));
        }
    }
    Ok(())
}

/// Prepends `_id` and `_rev` so every index can project results without
/// loading bodies.
fn normalize_fields(fields: Vec<FieldSort>) -> Vec<FieldSort> {
    let mut normalized = Vec::with_capacity(fields.len() + 2);
    if !fields.iter().any(|f| f.field == "_id") {
        normalized.push(FieldSort::ascending("_id"));
    }
    if !fields.iter().any(|f| f.field == "_rev") {
        normalized.push(FieldSort::ascending("_rev"));
    }
    normalized.extend(fields);
    normalized
}
