//! Secondary indexes over winning revisions
//!
//! An index is a named projection of every document's winning revision
//! onto a tuple of fields, materialized as a table (or FTS virtual
//! table) in an embedded SQLite database and refreshed incrementally
//! from the document store's sequence cursor.
//!
//! # Invariants
//!
//! - Index names and field-path segments match `^[A-Za-z][A-Za-z0-9_]*$`
//! - An index's metadata rows and its table are created and dropped
//!   together, transactionally
//! - After a successful update pass an index table holds exactly the
//!   projections of the winning, non-deleted revisions of every document
//!   with a revision at or below the index's `last_sequence`

mod creator;
mod definition;
mod errors;
mod manager;
pub(crate) mod projection;
mod updater;

pub use definition::{
    generated_index_name, table_name_for_index, valid_field_path, valid_index_name, FieldSort,
    Index, IndexSettings, IndexType, SortDirection, DEFAULT_TOKENIZER, EXTENSION_NAME,
    FTS_CHECK_TABLE, INDEX_DB_FILE, INDEX_METADATA_TABLE, INDEX_TABLE_PREFIX,
};
pub use errors::{IndexError, IndexResult};
pub use manager::IndexManager;
