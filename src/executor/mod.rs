//! Query execution over index tables
//!
//! Consumes plans from the planner and produces `QueryResult`s. Every
//! scan runs as one SQL statement on the writer queue; scans intersect
//! by `_id`, sorts that the chosen index cannot answer fall back to an
//! in-memory post-sort, and results materialize revisions lazily by
//! joining back to the document store on `(_id, _rev)`.

mod executor;
mod result;
mod sorter;
mod translate;

pub(crate) use executor::execute;

pub use executor::FindOptions;
pub use result::QueryResult;
