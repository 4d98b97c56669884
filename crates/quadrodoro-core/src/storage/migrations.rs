//! Database schema migrations for quadrodoro.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use tracing::{debug, info};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "checking schema");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    Ok(conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: tasks, focus sessions, work log and daily reflections.
///
/// Timestamps are RFC 3339 strings in local time, so the first ten
/// characters are the local calendar date. `date` columns duplicate that
/// date for indexed per-day queries.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            description         TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            quadrant            INTEGER NOT NULL,
            estimated_pomodoros INTEGER NOT NULL DEFAULT 0,
            actual_pomodoros    INTEGER NOT NULL DEFAULT 0,
            is_completed        INTEGER NOT NULL DEFAULT 0,
            completed_at        TEXT
        );

        CREATE TABLE IF NOT EXISTS pomodoro_sessions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id       INTEGER,
            start_time    TEXT NOT NULL,
            end_time      TEXT,
            duration_secs INTEGER NOT NULL,
            status        TEXT NOT NULL,
            date          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS logs (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            content   TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            task_id   INTEGER,
            date      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_reflections (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            date       TEXT NOT NULL UNIQUE,
            content    TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    info!("applied schema migration v1");
    Ok(())
}

/// Migration v2: indexes for the per-day and per-task statistics queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_sessions_date_status ON pomodoro_sessions(date, status);
         CREATE INDEX IF NOT EXISTS idx_sessions_task_status ON pomodoro_sessions(task_id, status);
         CREATE INDEX IF NOT EXISTS idx_logs_date ON logs(date);
         CREATE INDEX IF NOT EXISTS idx_logs_task ON logs(task_id);
         CREATE INDEX IF NOT EXISTS idx_tasks_quadrant ON tasks(quadrant, is_completed);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    info!("applied schema migration v2");
    Ok(())
}
