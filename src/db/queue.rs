//! SqlQueue - serialized single-writer access to one SQLite database
//!
//! The queue owns the only connection, held by a dedicated worker thread.
//! Submissions are boxed closures delivered over a channel; the caller
//! blocks until the worker has executed its closure and sent the result
//! back. Dropping the queue (or calling `shutdown`) closes the channel,
//! lets the worker drain what was already queued and joins it.

use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use rusqlite::Connection;
use tracing::{debug, warn};

use super::errors::{DbError, DbResult};

type Job = Box<dyn FnOnce(&mut Connection) + Send>;

/// Single-writer serialized queue over one `rusqlite::Connection`.
pub struct SqlQueue {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SqlQueue {
    /// Opens the database at `path` and starts the worker thread.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened index database");

        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("syncstore-index-db".to_string())
            .spawn(move || {
                let mut connection = connection;
                while let Ok(job) = receiver.recv() {
                    job(&mut connection);
                }
            })
            .map_err(|e| DbError::ExecutionFailed(format!("failed to spawn writer thread: {e}")))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Runs a closure on the worker thread and blocks on its result.
    pub fn submit<T, F>(&self, operation: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        self.dispatch(move |connection| operation(connection))
    }

    /// Runs a closure inside a transaction on the worker thread.
    ///
    /// The transaction commits when the closure succeeds and rolls back
    /// when it errors, so partial effects are never visible.
    pub fn submit_transaction<T, F>(&self, operation: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        self.dispatch(move |connection| {
            let tx = connection.transaction()?;
            let value = operation(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    fn dispatch<T, F>(&self, operation: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DbResult<T> + Send + 'static,
    {
        let (reply, result) = mpsc::channel();
        let job: Job = Box::new(move |connection| {
            let _ = reply.send(operation(connection));
        });

        {
            let sender = self.sender.lock().expect("queue sender lock poisoned");
            let Some(sender) = sender.as_ref() else {
                return Err(DbError::Interrupted);
            };
            sender.send(job).map_err(|_| DbError::Interrupted)?;
        }

        result.recv().map_err(|_| DbError::Interrupted)?
    }

    /// Drains queued submissions and joins the worker thread.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .expect("queue sender lock poisoned")
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .expect("queue worker lock poisoned")
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("index database worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for SqlQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn temp_queue() -> (tempfile::TempDir, SqlQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = SqlQueue::open(dir.path().join("test.sqlite")).unwrap();
        (dir, queue)
    }

    #[test]
    fn test_submit_runs_serialized_statements() {
        let (_dir, queue) = temp_queue();

        queue
            .submit(|conn| {
                conn.execute("CREATE TABLE t (v INTEGER)", [])?;
                Ok(())
            })
            .unwrap();
        queue
            .submit(|conn| {
                conn.execute("INSERT INTO t (v) VALUES (?1)", params![42])?;
                Ok(())
            })
            .unwrap();

        let value: i64 = queue
            .submit(|conn| Ok(conn.query_row("SELECT v FROM t", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (_dir, queue) = temp_queue();

        queue
            .submit(|conn| {
                conn.execute("CREATE TABLE t (v INTEGER)", [])?;
                Ok(())
            })
            .unwrap();

        let outcome: DbResult<()> = queue.submit_transaction(|conn| {
            conn.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(DbError::ExecutionFailed("forced failure".to_string()))
        });
        assert!(outcome.is_err());

        let count: i64 = queue
            .submit(|conn| Ok(conn.query_row("SELECT count(*) FROM t", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let (_dir, queue) = temp_queue();

        queue
            .submit_transaction(|conn| {
                conn.execute("CREATE TABLE t (v INTEGER)", [])?;
                conn.execute("INSERT INTO t (v) VALUES (7)", [])?;
                Ok(())
            })
            .unwrap();

        let count: i64 = queue
            .submit(|conn| Ok(conn.query_row("SELECT count(*) FROM t", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_submit_after_shutdown_is_interrupted() {
        let (_dir, queue) = temp_queue();
        queue.shutdown();

        let outcome: DbResult<()> = queue.submit(|_| Ok(()));
        assert!(matches!(outcome, Err(DbError::Interrupted)));
    }

    #[test]
    fn test_shutdown_twice_is_harmless() {
        let (_dir, queue) = temp_queue();
        queue.shutdown();
        queue.shutdown();
    }
}
