//! Focus session history.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{conversion_error, decode_date, decode_time, encode_date, encode_time};
use super::Database;
use crate::error::Result;

/// Lifecycle of a persisted focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Abandoned,
    /// Ended early by the user but counted as done.
    ForceCompleted,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
            SessionStatus::ForceCompleted => "force_completed",
        }
    }

    /// Whether the session counts as a finished pomodoro.
    pub fn is_counted(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::ForceCompleted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown session status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            "force_completed" => Ok(SessionStatus::ForceCompleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A row of `pomodoro_sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub task_id: Option<i64>,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    pub duration_secs: u64,
    pub status: SessionStatus,
    pub date: NaiveDate,
}

const SESSION_COLUMNS: &str = "id, task_id, start_time, end_time, duration_secs, status, date";

// Status filter for sessions that count as a finished pomodoro.
const COUNTED: &str = "status IN ('completed', 'force_completed')";

impl Database {
    // ── Sessions ─────────────────────────────────────────────────────

    /// Record a session as `running` and return its id.
    pub fn begin_session(
        &self,
        task_id: Option<i64>,
        start_time: DateTime<Local>,
        duration_secs: u64,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO pomodoro_sessions (task_id, start_time, duration_secs, status, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task_id,
                encode_time(&start_time),
                duration_secs,
                SessionStatus::Running.as_str(),
                encode_date(start_time.date_naive())
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Close a session with its final status. Returns `false` if it does
    /// not exist.
    pub fn end_session(
        &self,
        id: i64,
        status: SessionStatus,
        end_time: DateTime<Local>,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE pomodoro_sessions SET end_time = ?2, status = ?3 WHERE id = ?1",
            params![id, encode_time(&end_time), status.as_str()],
        )?;
        Ok(changed > 0)
    }

    pub fn get_session(&self, id: i64) -> Result<Option<SessionRecord>> {
        let session = self
            .conn()
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM pomodoro_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Every session, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions ORDER BY start_time, id"
        ))?;
        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Counted sessions started on `date`, in start order.
    pub fn completed_sessions_on(&self, date: NaiveDate) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
             WHERE date = ?1 AND {COUNTED}
             ORDER BY start_time, id"
        ))?;
        let sessions = stmt
            .query_map(params![encode_date(date)], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Counted sessions for one task, in start order.
    pub fn completed_sessions_for_task(&self, task_id: i64) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
             WHERE task_id = ?1 AND {COUNTED}
             ORDER BY start_time, id"
        ))?;
        let sessions = stmt
            .query_map(params![task_id], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn daily_pomodoro_count(&self, date: NaiveDate) -> Result<u64> {
        let count = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM pomodoro_sessions WHERE date = ?1 AND {COUNTED}"),
            params![encode_date(date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn task_pomodoro_count(&self, task_id: i64) -> Result<u64> {
        let count = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM pomodoro_sessions WHERE task_id = ?1 AND {COUNTED}"),
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Counted sessions per day of the month. Days without sessions are absent.
    pub fn monthly_pomodoro_counts(&self, year: i32, month: u32) -> Result<BTreeMap<u32, u64>> {
        let prefix = format!("{year:04}-{month:02}-");
        let mut stmt = self.conn().prepare(&format!(
            "SELECT date, COUNT(*) FROM pomodoro_sessions
             WHERE substr(date, 1, 8) = ?1 AND {COUNTED}
             GROUP BY date ORDER BY date"
        ))?;
        let rows = stmt.query_map(params![prefix], |row| {
            let date = decode_date(0, &row.get::<_, String>(0)?)?;
            Ok((date.day(), row.get::<_, u64>(1)?))
        })?;
        let counts = rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(counts)
    }

    /// Distinct dates with at least one counted session, newest first.
    pub fn pomodoro_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT DISTINCT date FROM pomodoro_sessions WHERE {COUNTED} ORDER BY date DESC"
        ))?;
        let dates = stmt
            .query_map([], |row| decode_date(0, &row.get::<_, String>(0)?))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }

    /// Counted sessions between two dates, both inclusive. `None` leaves
    /// that end open.
    pub fn pomodoros_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<u64> {
        let count = self.conn().query_row(
            &format!(
                "SELECT COUNT(*) FROM pomodoro_sessions
                 WHERE {COUNTED}
                   AND (?1 IS NULL OR date >= ?1)
                   AND (?2 IS NULL OR date <= ?2)"
            ),
            params![start.map(encode_date), end.map(encode_date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn total_pomodoros(&self) -> Result<u64> {
        self.pomodoros_between(None, None)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let status: String = row.get(5)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        task_id: row.get(1)?,
        start_time: decode_time(2, &row.get::<_, String>(2)?)?,
        end_time: row
            .get::<_, Option<String>>(3)?
            .map(|s| decode_time(3, &s))
            .transpose()?,
        duration_secs: row.get(4)?,
        status: status
            .parse()
            .map_err(|e| conversion_error(5, Type::Text, e))?,
        date: decode_date(6, &row.get::<_, String>(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn finished(db: &Database, task: Option<i64>, start: DateTime<Local>, status: SessionStatus) {
        let id = db.begin_session(task, start, 1500).unwrap();
        db.end_session(id, status, start + chrono::Duration::minutes(25))
            .unwrap();
    }

    #[test]
    fn status_strings() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
            SessionStatus::ForceCompleted,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
        assert!(SessionStatus::ForceCompleted.is_counted());
        assert!(!SessionStatus::Abandoned.is_counted());
    }

    #[test]
    fn begin_then_end() {
        let db = Database::open_memory().unwrap();
        let id = db.begin_session(Some(7), at(3, 9), 1800).unwrap();

        let running = db.get_session(id).unwrap().unwrap();
        assert_eq!(running.status, SessionStatus::Running);
        assert_eq!(running.task_id, Some(7));
        assert_eq!(running.date, day(3));
        assert!(running.end_time.is_none());

        assert!(db.end_session(id, SessionStatus::Completed, at(3, 10)).unwrap());
        let done = db.get_session(id).unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.end_time, Some(at(3, 10)));

        assert!(!db.end_session(id + 1, SessionStatus::Completed, at(3, 10)).unwrap());
    }

    #[test]
    fn counts_include_force_completed_only() {
        let db = Database::open_memory().unwrap();
        finished(&db, Some(1), at(3, 9), SessionStatus::Completed);
        finished(&db, Some(1), at(3, 10), SessionStatus::ForceCompleted);
        finished(&db, Some(1), at(3, 11), SessionStatus::Abandoned);
        db.begin_session(Some(1), at(3, 12), 1500).unwrap();

        assert_eq!(db.daily_pomodoro_count(day(3)).unwrap(), 2);
        assert_eq!(db.task_pomodoro_count(1).unwrap(), 2);
        assert_eq!(db.completed_sessions_on(day(3)).unwrap().len(), 2);
        assert_eq!(db.completed_sessions_for_task(1).unwrap().len(), 2);
        assert_eq!(db.list_sessions().unwrap().len(), 4);
    }

    #[test]
    fn monthly_counts_and_dates() {
        let db = Database::open_memory().unwrap();
        finished(&db, None, at(1, 9), SessionStatus::Completed);
        finished(&db, None, at(1, 10), SessionStatus::Completed);
        finished(&db, None, at(15, 9), SessionStatus::Completed);
        finished(&db, None, at(20, 9), SessionStatus::Abandoned);
        let july = Local.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        finished(&db, None, july, SessionStatus::Completed);

        let june = db.monthly_pomodoro_counts(2024, 6).unwrap();
        assert_eq!(june.get(&1), Some(&2));
        assert_eq!(june.get(&15), Some(&1));
        assert_eq!(june.get(&20), None);
        assert_eq!(june.len(), 2);

        let dates = db.pomodoro_dates().unwrap();
        assert_eq!(
            dates,
            vec![NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), day(15), day(1)]
        );
    }

    #[test]
    fn range_totals() {
        let db = Database::open_memory().unwrap();
        finished(&db, None, at(1, 9), SessionStatus::Completed);
        finished(&db, None, at(2, 9), SessionStatus::Completed);
        finished(&db, None, at(3, 9), SessionStatus::ForceCompleted);

        assert_eq!(db.total_pomodoros().unwrap(), 3);
        assert_eq!(db.pomodoros_between(Some(day(2)), None).unwrap(), 2);
        assert_eq!(db.pomodoros_between(None, Some(day(2))).unwrap(), 2);
        assert_eq!(db.pomodoros_between(Some(day(2)), Some(day(2))).unwrap(), 1);
    }
}
