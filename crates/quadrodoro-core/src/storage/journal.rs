//! Work log entries, daily reflections and the JSON export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::database::{decode_date, decode_time, encode_date, encode_time};
use super::{Database, SessionRecord};
use crate::error::Result;
use crate::task::Task;

/// A row of `logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub task_id: Option<i64>,
    pub date: NaiveDate,
}

/// Free-text reflection written for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: i64,
    pub date: NaiveDate,
    pub content: String,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// Everything in the database, as written by [`Database::export_json`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Export {
    pub exported_at: DateTime<Local>,
    pub tasks: Vec<Task>,
    pub sessions: Vec<SessionRecord>,
    pub logs: Vec<LogEntry>,
    pub reflections: Vec<Reflection>,
}

const LOG_COLUMNS: &str = "id, content, timestamp, task_id, date";
const REFLECTION_COLUMNS: &str = "id, date, content, created_at, updated_at";

impl Database {
    // ── Work log ─────────────────────────────────────────────────────

    pub fn insert_log(
        &self,
        content: &str,
        task_id: Option<i64>,
        timestamp: DateTime<Local>,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO logs (content, timestamp, task_id, date) VALUES (?1, ?2, ?3, ?4)",
            params![
                content,
                encode_time(&timestamp),
                task_id,
                encode_date(timestamp.date_naive())
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn get_log(&self, id: i64) -> Result<Option<LogEntry>> {
        let entry = self
            .conn()
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = ?1"),
                params![id],
                log_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Entries written on `date`, oldest first.
    pub fn logs_on(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs WHERE date = ?1 ORDER BY timestamp, id"),
            params![encode_date(date)],
        )
    }

    /// Entries attached to one task, oldest first.
    pub fn logs_for_task(&self, task_id: i64) -> Result<Vec<LogEntry>> {
        self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs WHERE task_id = ?1 ORDER BY timestamp, id"),
            params![task_id],
        )
    }

    /// The `limit` newest entries, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs ORDER BY timestamp DESC, id DESC LIMIT ?1"),
            params![limit],
        )
    }

    /// Case-insensitive substring search over log content, newest first.
    /// With `date`, only entries written that day are searched.
    pub fn search_logs(&self, needle: &str, date: Option<NaiveDate>) -> Result<Vec<LogEntry>> {
        let pattern = format!("%{}%", escape_like(needle));
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs
                 WHERE content LIKE ?1 ESCAPE '\\' AND (?2 IS NULL OR date = ?2)
                 ORDER BY timestamp DESC, id DESC"
            ),
            params![pattern, date.map(encode_date)],
        )
    }

    fn query_logs(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn().prepare(sql)?;
        let entries = stmt
            .query_map(params, log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    // ── Reflections ──────────────────────────────────────────────────

    /// Insert or replace the reflection for `date` and return it.
    /// `created_at` is kept on replacement.
    pub fn save_reflection(
        &self,
        date: NaiveDate,
        content: &str,
        now: DateTime<Local>,
    ) -> Result<Reflection> {
        let now = encode_time(&now);
        self.conn().execute(
            "INSERT INTO daily_reflections (date, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(date) DO UPDATE SET
                content    = excluded.content,
                updated_at = excluded.updated_at",
            params![encode_date(date), content, now],
        )?;
        let reflection = self.conn().query_row(
            &format!("SELECT {REFLECTION_COLUMNS} FROM daily_reflections WHERE date = ?1"),
            params![encode_date(date)],
            reflection_from_row,
        )?;
        Ok(reflection)
    }

    pub fn get_reflection(&self, date: NaiveDate) -> Result<Option<Reflection>> {
        let reflection = self
            .conn()
            .query_row(
                &format!("SELECT {REFLECTION_COLUMNS} FROM daily_reflections WHERE date = ?1"),
                params![encode_date(date)],
                reflection_from_row,
            )
            .optional()?;
        Ok(reflection)
    }

    /// All reflections, newest date first.
    pub fn list_reflections(&self) -> Result<Vec<Reflection>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM daily_reflections ORDER BY date DESC"
        ))?;
        let reflections = stmt
            .query_map([], reflection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reflections)
    }

    // ── Export ───────────────────────────────────────────────────────

    pub fn export(&self) -> Result<Export> {
        let logs = self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs ORDER BY timestamp, id"),
            params![],
        )?;
        Ok(Export {
            exported_at: Local::now(),
            tasks: self.list_tasks(true)?,
            sessions: self.list_sessions()?,
            logs,
            reflections: self.list_reflections()?,
        })
    }

    /// Write the full contents of the database to `path` as pretty JSON.
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let export = self.export()?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(
            path = %path.display(),
            tasks = export.tasks.len(),
            sessions = export.sessions.len(),
            "exported database"
        );
        Ok(())
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        timestamp: decode_time(2, &row.get::<_, String>(2)?)?,
        task_id: row.get(3)?,
        date: decode_date(4, &row.get::<_, String>(4)?)?,
    })
}

fn reflection_from_row(row: &Row<'_>) -> rusqlite::Result<Reflection> {
    Ok(Reflection {
        id: row.get(0)?,
        date: decode_date(1, &row.get::<_, String>(1)?)?,
        content: row.get(2)?,
        created_at: decode_time(3, &row.get::<_, String>(3)?)?,
        updated_at: decode_time(4, &row.get::<_, String>(4)?)?,
    })
}
