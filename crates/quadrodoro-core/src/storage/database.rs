//! SQLite-backed repository.
//!
//! Provides persistent storage for:
//! - Eisenhower tasks
//! - Focus session history (see `sessions.rs`)
//! - Work log entries and daily reflections (see `journal.rs`)
//!
//! Timestamps are stored as RFC 3339 strings in local time, so
//! `substr(col, 1, 10)` is the local calendar date of the row.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::task::{Quadrant, Task, TaskUpdate};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "quadrodoro.db";

const TASK_COLUMNS: &str = "id, description, created_at, quadrant, estimated_pomodoros,
     actual_pomodoros, is_completed, completed_at";

/// SQLite database holding tasks, sessions, logs and reflections.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/quadrodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join(DATABASE_FILE);
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert a task and return its id.
    pub fn insert_task(
        &self,
        description: &str,
        quadrant: Quadrant,
        estimated_pomodoros: u32,
        created_at: DateTime<Local>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tasks (description, created_at, quadrant, estimated_pomodoros)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                description,
                encode_time(&created_at),
                quadrant.index(),
                estimated_pomodoros
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// All tasks, newest first.
    pub fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>> {
        let sql = if include_completed {
            format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC")
        } else {
            format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE is_completed = 0
                 ORDER BY created_at DESC, id DESC"
            )
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Tasks in one quadrant, newest first.
    pub fn list_tasks_by_quadrant(
        &self,
        quadrant: Quadrant,
        include_completed: bool,
    ) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE quadrant = ?1 AND (?2 OR is_completed = 0)
             ORDER BY created_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map(params![quadrant.index(), include_completed], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Completed tasks, most recently completed first. With `on`, only tasks
    /// completed on that local date.
    pub fn list_completed_tasks(&self, on: Option<NaiveDate>) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE is_completed = 1 AND (?1 IS NULL OR substr(completed_at, 1, 10) = ?1)
             ORDER BY completed_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map(params![on.map(encode_date)], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Apply the non-empty fields of `update`. Returns `false` when the task
    /// does not exist or nothing was requested.
    pub fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE tasks SET
                description         = COALESCE(?2, description),
                quadrant            = COALESCE(?3, quadrant),
                estimated_pomodoros = COALESCE(?4, estimated_pomodoros)
             WHERE id = ?1",
            params![
                id,
                update.description,
                update.quadrant.map(Quadrant::index),
                update.estimated_pomodoros
            ],
        )?;
        Ok(changed > 0)
    }

    /// Mark a task completed. Returns `false` if it is missing or already done.
    pub fn complete_task(&self, id: i64, completed_at: DateTime<Local>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_completed = 1, completed_at = ?2
             WHERE id = ?1 AND is_completed = 0",
            params![id, encode_time(&completed_at)],
        )?;
        Ok(changed > 0)
    }

    /// Delete a task. Session and log rows referencing it are kept.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn increment_task_pomodoros(&self, id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET actual_pomodoros = actual_pomodoros + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Open tasks per quadrant, indexed by [`Quadrant::index`].
    ///
    /// Without a date this is the current state. With a date it is the
    /// snapshot at the end of that day: tasks created on or before it that
    /// were not yet completed by then.
    pub fn pending_counts_by_quadrant(&self, as_of: Option<NaiveDate>) -> Result<[u64; 4]> {
        let rows: Vec<(i64, u64)> = match as_of {
            None => self
                .conn
                .prepare(
                    "SELECT quadrant, COUNT(*) FROM tasks
                     WHERE is_completed = 0
                     GROUP BY quadrant",
                )?
                .query_map([], quadrant_count)?
                .collect::<rusqlite::Result<_>>()?,
            Some(date) => self
                .conn
                .prepare(
                    "SELECT quadrant, COUNT(*) FROM tasks
                     WHERE substr(created_at, 1, 10) <= ?1
                       AND (is_completed = 0 OR substr(completed_at, 1, 10) > ?1)
                     GROUP BY quadrant",
                )?
                .query_map(params![encode_date(date)], quadrant_count)?
                .collect::<rusqlite::Result<_>>()?,
        };

        let mut counts = [0u64; 4];
        for (quadrant, count) in rows {
            if let Some(slot) = usize::try_from(quadrant).ok().and_then(|q| counts.get_mut(q)) {
                *slot = count;
            }
        }
        Ok(counts)
    }

    /// Total and completed task counts per quadrant, indexed by
    /// [`Quadrant::index`].
    pub fn task_counts_by_quadrant(&self) -> Result<[(u64, u64); 4]> {
        let mut counts = [(0u64, 0u64); 4];
        let mut stmt = self.conn.prepare(
            "SELECT quadrant, COUNT(*), COALESCE(SUM(is_completed), 0)
             FROM tasks GROUP BY quadrant",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;
        for row in rows {
            let (quadrant, total, completed) = row?;
            if let Some(slot) = usize::try_from(quadrant).ok().and_then(|q| counts.get_mut(q)) {
                *slot = (total, completed);
            }
        }
        Ok(counts)
    }
}

fn quadrant_count(row: &Row<'_>) -> rusqlite::Result<(i64, u64)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let quadrant: i64 = row.get(3)?;
    Ok(Task {
        id: row.get(0)?,
        description: row.get(1)?,
        created_at: decode_time(2, &row.get::<_, String>(2)?)?,
        quadrant: Quadrant::try_from(quadrant).map_err(|e| conversion_error(3, Type::Integer, e))?,
        estimated_pomodoros: row.get(4)?,
        actual_pomodoros: row.get(5)?,
        is_completed: row.get(6)?,
        completed_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| decode_time(7, &s))
            .transpose()?,
    })
}

pub(super) fn encode_time(time: &DateTime<Local>) -> String {
    time.to_rfc3339()
}

pub(super) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(super) fn decode_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

pub(super) fn decode_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| conversion_error(idx, Type::Text, e))
}

pub(super) fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}
