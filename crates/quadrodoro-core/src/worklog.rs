//! Free-form work log and daily reflections.

use chrono::{Local, NaiveDate};

use crate::error::{non_empty, CoreError, Result};
use crate::storage::{Database, LogEntry, Reflection};

/// Validating front end for log entries and reflections.
pub struct LogManager<'a> {
    db: &'a Database,
}

impl<'a> LogManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an entry stamped with the current time.
    ///
    /// # Errors
    /// Fails when `content` is blank.
    pub fn add(&self, content: &str, task_id: Option<i64>) -> Result<LogEntry> {
        let content = non_empty(content, "content")?;
        let id = self.db.insert_log(content, task_id, Local::now())?;
        self.db
            .get_log(id)?
            .ok_or(CoreError::NotFound { kind: "log", id })
    }

    pub fn today(&self) -> Result<Vec<LogEntry>> {
        self.on(Local::now().date_naive())
    }

    pub fn on(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        self.db.logs_on(date)
    }

    pub fn for_task(&self, task_id: i64) -> Result<Vec<LogEntry>> {
        self.db.logs_for_task(task_id)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.db.recent_logs(limit)
    }

    /// Entries containing `needle`, ignoring ASCII case, optionally only
    /// those written on `date`. A blank needle matches nothing.
    pub fn search(&self, needle: &str, date: Option<NaiveDate>) -> Result<Vec<LogEntry>> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        self.db.search_logs(needle, date)
    }

    /// Write or replace the reflection for `date`.
    pub fn reflect(&self, date: NaiveDate, content: &str) -> Result<Reflection> {
        let content = non_empty(content, "content")?;
        self.db.save_reflection(date, content, Local::now())
    }

    pub fn reflection(&self, date: NaiveDate) -> Result<Option<Reflection>> {
        self.db.get_reflection(date)
    }

    pub fn reflections(&self) -> Result<Vec<Reflection>> {
        self.db.list_reflections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn add_rejects_blank_content() {
        let db = Database::open_memory().unwrap();
        let logs = LogManager::new(&db);
        let err = logs.add("   ", None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyText { field: "content" })
        ));
    }

    #[test]
    fn add_trims_and_lists_today() {
        let db = Database::open_memory().unwrap();
        let logs = LogManager::new(&db);
        let entry = logs.add("  reviewed PR  ", Some(3)).unwrap();
        assert_eq!(entry.content, "reviewed PR");
        assert_eq!(entry.task_id, Some(3));
        assert_eq!(entry.date, Local::now().date_naive());

        assert_eq!(logs.today().unwrap().len(), 1);
        assert_eq!(logs.for_task(3).unwrap().len(), 1);
        assert_eq!(logs.recent(5).unwrap().len(), 1);
    }

    #[test]
    fn blank_search_matches_nothing() {
        let db = Database::open_memory().unwrap();
        let logs = LogManager::new(&db);
        logs.add("anything", None).unwrap();
        assert!(logs.search("  ", None).unwrap().is_empty());
        assert_eq!(logs.search("ANY", None).unwrap().len(), 1);

        let today = Local::now().date_naive();
        assert_eq!(logs.search("any", Some(today)).unwrap().len(), 1);
        let yesterday = today.pred_opt().unwrap();
        assert!(logs.search("any", Some(yesterday)).unwrap().is_empty());
    }

    #[test]
    fn reflections() {
        let db = Database::open_memory().unwrap();
        let logs = LogManager::new(&db);
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert!(logs.reflection(day).unwrap().is_none());

        let saved = logs.reflect(day, " calm day ").unwrap();
        assert_eq!(saved.content, "calm day");
        assert!(logs.reflect(day, "").is_err());
        assert_eq!(logs.reflections().unwrap().len(), 1);
    }
}
