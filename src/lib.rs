//! syncstore - the core of a client-side replicable document store
//!
//! Two cooperating subsystems:
//!
//! - `datastore`: the revision-forest model underlying MVCC for documents.
//!   Each document's history is a forest of revision trees; the forest is
//!   the ground truth for conflict detection, replication exchange and
//!   winner selection.
//! - `index`: named secondary indexes over winning revisions, materialized
//!   as tables in an embedded SQLite database and refreshed incrementally
//!   from the document store's sequence cursor. Queries are planned over
//!   index metadata (`planner`) and executed as SQL (`executor`).
//!
//! The persistent document body store itself is an external collaborator
//! behind the `datastore::DocumentStore` trait. All index database access
//! goes through a single-writer serialized queue (`db::SqlQueue`).

pub mod datastore;
pub mod db;
pub mod executor;
pub mod index;
pub mod planner;
