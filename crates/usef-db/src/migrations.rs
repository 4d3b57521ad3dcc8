//! Embedded SQL migration runner.
//!
//! Migrations are SQL files embedded at compile time. They run sequentially
//! on startup, tracked by the `_usef_migrations` table. Each migration
//! runs exactly once; if it has already been applied, it is skipped.

use rusqlite::Connection;
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_init",
        sql: include_str!("migrations/000_init.sql"),
    },
    Migration {
        name: "001_seen_message_ids",
        sql: include_str!("migrations/001_seen_message_ids.sql"),
    },
    Migration {
        name: "002_seen_message_hashes",
        sql: include_str!("migrations/002_seen_message_hashes.sql"),
    },
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

impl MigrationError {
    fn failed(name: &str) -> impl FnOnce(rusqlite::Error) -> Self {
        let name = name.to_string();
        move |source| Self::ExecutionFailed { name, source }
    }
}

/// Runs all pending migrations against the given connection.
///
/// Returns the number of migrations applied by this call; migrations already
/// recorded in `_usef_migrations` are skipped.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// migration tracking table cannot be queried.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _usef_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(MigrationError::failed("_usef_migrations_bootstrap"))?;

    let mut applied = 0;
    for migration in migrations {
        if is_applied(conn, migration.name)? {
            tracing::debug!(migration = migration.name, "migration already applied");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");
        apply(conn, migration)?;
        applied += 1;
    }

    Ok(applied)
}

fn is_applied(conn: &Connection, name: &str) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM _usef_migrations WHERE name = ?1",
        [name],
        |row| row.get(0),
    )
    .map_err(MigrationError::StateQuery)
}

/// Applies one migration and its tracking row atomically.
fn apply(conn: &Connection, migration: &Migration) -> Result<(), MigrationError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(MigrationError::failed(migration.name))?;
    tx.execute_batch(migration.sql)
        .map_err(MigrationError::failed(migration.name))?;
    tx.execute(
        "INSERT INTO _usef_migrations (name) VALUES (?1)",
        [migration.name],
    )
    .map_err(MigrationError::failed(migration.name))?;
    tx.commit().map_err(MigrationError::failed(migration.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    #[test]
    fn run_migrations_on_fresh_db() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 3);

        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM _usef_migrations", [], |row| {
                row.get(0)
            })
            .expect("should query migration count");
        assert_eq!(count, 3);
    }

    #[test]
    fn run_migrations_idempotent() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");

        let first = run_migrations(&conn).expect("first run should succeed");
        assert_eq!(first, 3);

        let second = run_migrations(&conn).expect("second run should succeed");
        assert_eq!(second, 0, "no new migrations to apply");
    }

    #[test]
    fn replay_tables_exist() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        assert!(table_exists(&conn, "seen_message_ids"));
        assert!(table_exists(&conn, "seen_message_hashes"));
    }

    #[test]
    fn content_hash_must_be_32_bytes() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        let res = conn.execute(
            "INSERT INTO seen_message_hashes (content_hash, received_at) VALUES (?1, ?2)",
            rusqlite::params![vec![0u8; 16], "2015-01-01T00:00:00Z"],
        );
        assert!(res.is_err(), "short hash should violate the check constraint");
    }

    #[test]
    fn migration_side_effects_rollback_when_tracking_insert_fails() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let migrations = [Migration {
            name: "001_tracking_insert_conflict",
            sql: "
                CREATE TABLE rollback_marker (id INTEGER PRIMARY KEY);
                INSERT INTO _usef_migrations (name) VALUES ('001_tracking_insert_conflict');
            ",
        }];

        let err = run_migrations_from_list(&conn, &migrations)
            .expect_err("tracking insert conflict should fail migration");

        match err {
            MigrationError::ExecutionFailed { name, .. } => {
                assert_eq!(name, "001_tracking_insert_conflict")
            }
            other => panic!("unexpected error type: {other:?}"),
        }

        assert!(
            !table_exists(&conn, "rollback_marker"),
            "schema side effects should be rolled back when tracking insert fails"
        );
    }
}
