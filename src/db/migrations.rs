//! Versioned, idempotent schema migrations for the index database
//!
//! The applied schema version lives in `PRAGMA user_version`. Each
//! migration runs in its own transaction that also bumps the version, so
//! a migration is either fully applied and recorded or not applied at
//! all. Re-applying an already-recorded migration is a no-op.

use rusqlite::Connection;

use super::errors::DbResult;

/// One schema step: the statements to run and the version they produce.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// `user_version` after this migration has been applied
    pub version: i64,
    /// DDL statements, without trailing semicolons
    pub statements: &'static [&'static str],
}

/// Applies every migration whose version exceeds the recorded one.
pub fn apply_migrations(connection: &Connection, migrations: &[Migration]) -> DbResult<()> {
    for migration in migrations {
        let current = user_version(connection)?;
        if current >= migration.version {
            continue;
        }

        let mut script = String::from("BEGIN;\n");
        for statement in migration.statements {
            script.push_str(statement);
            script.push_str(";\n");
        }
        script.push_str(&format!(
            "PRAGMA user_version = {};\nCOMMIT;",
            migration.version
        ));

        if let Err(e) = connection.execute_batch(&script) {
            let _ = connection.execute_batch("ROLLBACK");
            return Err(e.into());
        }
    }
    Ok(())
}

fn user_version(connection: &Connection) -> DbResult<i64> {
    Ok(connection.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
