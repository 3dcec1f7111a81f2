//! Index metadata model
//!
//! The metadata for an index is one row per field in a shared table:
//!
//! ```text
//!   index_name | index_type | field_name | last_sequence | index_settings
//!   ----------------------------------------------------------------------
//!     name     |  json      |  _id       |  0            |  {}
//!     name     |  json      |  _rev      |  0            |  {}
//!     name     |  json      |  firstName |  0            |  {}
//!     name     |  json      |  lastName  |  0            |  {}
//! ```
//!
//! The index itself is one table per index with a column for `_id`,
//! `_rev` and each indexed field, covered by a single compound SQLite
//! index (a full-text virtual table for text indexes). `_id` and `_rev`
//! are part of every index so results can be projected without loading
//! bodies from the document store.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Shared metadata table, one row per indexed field
pub const INDEX_METADATA_TABLE: &str = "_t_cloudant_sync_query_metadata";

/// Prefix of every per-index table name
pub const INDEX_TABLE_PREFIX: &str = "_t_cloudant_sync_query_index_";

/// Transient table used by the FTS capability probe
pub const FTS_CHECK_TABLE: &str = "_t_cloudant_sync_query_fts_check";

/// Extension folder name under the document store's data directory
pub const EXTENSION_NAME: &str = "com.cloudant.sync.query";

/// File name of the index database inside the extension folder
pub const INDEX_DB_FILE: &str = "indexes.sqlite";

const IDENTIFIER_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_]*$";

/// Tokenizer used by text indexes when none is requested
pub const DEFAULT_TOKENIZER: &str = "simple";

/// Kind of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Plain table over JSON field projections
    Json,
    /// Full-text virtual table
    Text,
}

impl IndexType {
    /// The value stored in the metadata `index_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Json => "json",
            IndexType::Text => "text",
        }
    }

    /// Parses a metadata `index_type` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(IndexType::Json),
            "text" => Some(IndexType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction hint for one indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for ORDER BY clauses.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One indexed field: a dotted path plus a direction hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSort {
    /// Dotted field path, `address.city`
    pub field: String,
    /// Direction hint; not persisted in metadata
    pub direction: SortDirection,
}

impl FieldSort {
    /// Ascending field sort.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending field sort.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Per-index settings persisted as a JSON blob in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexSettings {
    /// FTS tokenizer, text indexes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenize: Option<String>,
}

impl IndexSettings {
    /// Serializes to the metadata blob. A json index serializes to `{}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parses a metadata blob. Only an object carrying a string
    /// `tokenize` member contributes a setting; anything else is empty.
    pub fn from_json(blob: Option<&str>) -> Self {
        let Some(blob) = blob else {
            return Self::default();
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(blob) else {
            return Self::default();
        };
        let tokenize = value
            .get("tokenize")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        Self { tokenize }
    }
}

/// A named secondary index assembled from its metadata rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Unique index name
    pub name: String,
    /// Index kind
    pub index_type: IndexType,
    /// Indexed fields in creation order, `_id` and `_rev` included
    pub fields: Vec<FieldSort>,
    /// Persisted settings
    pub settings: IndexSettings,
    /// Document-store sequence this index is current up to
    pub last_sequence: i64,
}

impl Index {
    /// The physical table backing this index.
    pub fn table_name(&self) -> String {
        table_name_for_index(&self.name)
    }

    /// Field paths in creation order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }

    /// Returns true if every path in `fields` is indexed here.
    pub fn covers(&self, fields: &[String]) -> bool {
        fields
            .iter()
            .all(|field| self.fields.iter().any(|f| &f.field == field))
    }

    /// Definition equivalence for idempotent creation: same kind, same
    /// ordered field paths, same tokenizer.
    pub fn definition_matches(
        &self,
        index_type: IndexType,
        fields: &[FieldSort],
        settings: &IndexSettings,
    ) -> bool {
        self.index_type == index_type
            && self.settings.tokenize == settings.tokenize
            && self.fields.len() == fields.len()
            && self
                .fields
                .iter()
                .zip(fields)
                .all(|(a, b)| a.field == b.field)
    }
}

/// The table name for an index name.
pub fn table_name_for_index(name: &str) -> String {
    format!("{INDEX_TABLE_PREFIX}{name}")
}

fn identifier_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// Returns true for a valid index name.
pub fn valid_index_name(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// Returns true for a valid dotted field path: every dot-separated
/// segment must match the identifier pattern.
pub fn valid_field_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| identifier_regex().is_match(segment))
}

/// Derives the deterministic name for an unnamed index from its sorted
/// field paths, kind and tokenizer.
pub fn generated_index_name(
    fields: &[FieldSort],
    index_type: IndexType,
    tokenize: Option<&str>,
) -> String {
    let mut paths: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
    paths.sort_unstable();

    let mut hasher = Sha256::new();
    for path in paths {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(index_type.as_str().as_bytes());
    if let Some(tokenize) = tokenize {
        hasher.update(b"\0");
        hasher.update(tokenize.as_bytes());
    }

    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    format!("idx_{}", &hex[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(valid_index_name("basic"));
        assert!(valid_index_name("Name_2"));
        assert!(!valid_index_name(""));
        assert!(!valid_index_name("9lives"));
        assert!(!valid_index_name("_private"));
        assert!(!valid_index_name("has space"));
        assert!(!valid_index_name("has-dash"));
    }

    #[test]
    fn test_field_path_validation() {
        assert!(valid_field_path("firstName"));
        assert!(valid_field_path("address.city"));
        assert!(!valid_field_path(""));
        assert!(!valid_field_path(".city"));
        assert!(!valid_field_path("address..city"));
        assert!(!valid_field_path("address.9th"));
    }

    #[test]
    fn test_table_name() {
        assert_eq!(
            table_name_for_index("name"),
            "_t_cloudant_sync_query_index_name"
        );
    }

    #[test]
    fn test_generated_name_is_deterministic() {
        let fields = vec![FieldSort::ascending("b"), FieldSort::ascending("a")];
        let reordered = vec![FieldSort::ascending("a"), FieldSort::ascending("b")];

        let name = generated_index_name(&fields, IndexType::Json, None);
        assert_eq!(name, generated_index_name(&reordered, IndexType::Json, None));
        assert!(valid_index_name(&name));
    }

    #[test]
    fn test_generated_name_varies_with_definition() {
        let fields = vec![FieldSort::ascending("a")];
        let json = generated_index_name(&fields, IndexType::Json, None);
        let text = generated_index_name(&fields, IndexType::Text, None);
        let tokenized = generated_index_name(&fields, IndexType::Text, Some("porter"));

        assert_ne!(json, text);
        assert_ne!(text, tokenized);
    }

    #[test]
    fn test_settings_round_trip() {
        let text = IndexSettings {
            tokenize: Some("porter".to_string()),
        };
        assert_eq!(text.to_json(), r#"{"tokenize":"porter"}"#);
        assert_eq!(IndexSettings::from_json(Some(&text.to_json())), text);

        let json = IndexSettings::default();
        assert_eq!(json.to_json(), "{}");
        assert_eq!(IndexSettings::from_json(Some("{}")), json);
        assert_eq!(IndexSettings::from_json(None), json);
        assert_eq!(IndexSettings::from_json(Some("not json")), json);
        assert_eq!(IndexSettings::from_json(Some(r#"{"tokenize":7}"#)), json);
    }

    #[test]
    fn test_definition_matching() {
        let index = Index {
            name: "n".to_string(),
            index_type: IndexType::Json,
            fields: vec![FieldSort::ascending("_id"), FieldSort::ascending("a")],
            settings: IndexSettings::default(),
            last_sequence: 0,
        };

        let same = vec![FieldSort::ascending("_id"), FieldSort::descending("a")];
        assert!(index.definition_matches(IndexType::Json, &same, &IndexSettings::default()));

        let reordered = vec![FieldSort::ascending("a"), FieldSort::ascending("_id")];
        assert!(!index.definition_matches(IndexType::Json, &reordered, &IndexSettings::default()));
        assert!(!index.definition_matches(IndexType::Text, &same, &IndexSettings::default()));
    }

    #[test]
    fn test_covers() {
        let index = Index {
            name: "n".to_string(),
            index_type: IndexType::Json,
            fields: vec![
                FieldSort::ascending("_id"),
                FieldSort::ascending("_rev"),
                FieldSort::ascending("age"),
            ],
            settings: IndexSettings::default(),
            last_sequence: 0,
        };

        assert!(index.covers(&["age".to_string()]));
        assert!(index.covers(&[]));
        assert!(!index.covers(&["age".to_string(), "name".to_string()]));
    }
}
