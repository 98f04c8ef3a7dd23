//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies pending
//! ones in order.

use rusqlite::Connection;

use super::error::DbError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_documents_table",
        sql: include_str!("sql/001_create_documents.sql"),
    },
    Migration {
        version: 2,
        description: "create_legal_holds_table",
        sql: include_str!("sql/002_create_legal_holds.sql"),
    },
    Migration {
        version: 3,
        description: "create_archive_records_table",
        sql: include_str!("sql/003_create_archive_records.sql"),
    },
    Migration {
        version: 4,
        description: "create_audit_events_table",
        sql: include_str!("sql/004_create_audit_events.sql"),
    },
];

/// Applies all pending migrations.
pub fn run_all(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for migration in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM _migrations WHERE version = ?1",
                [migration.version],
                |row| row.get::<_, u32>(0),
            )
            .map(|count| count > 0)?;

        if applied {
            continue;
        }

        conn.execute_batch(migration.sql)
            .map_err(|e| DbError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;

        log::debug!(
            "Applied migration {} ({})",
            migration.version,
            migration.description
        );
    }

    Ok(())
}
