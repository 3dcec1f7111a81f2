//! Single-writer access to the embedded index database
//!
//! Every read and write of the index database is a closure submitted to
//! `SqlQueue`, which executes submissions one at a time on a dedicated
//! worker thread that owns the only open connection.
//!
//! # Guarantees
//!
//! - Strict serializability of all submitted operations
//! - No locking on the database handle itself
//! - `submit_transaction` commits on success and rolls back on error
//! - Shutdown drains queued submissions before the worker exits
//!
//! Callers block on the submission's result; timeouts are a caller
//! concern and the queue imposes no deadline.

mod errors;
mod migrations;
mod queue;

pub use errors::{DbError, DbResult};
pub use migrations::{apply_migrations, Migration};
pub use queue::SqlQueue;
