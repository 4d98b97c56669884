//! Persists focus session outcomes.
//!
//! [`SessionRecorder`] follows a [`SessionTimer`]'s state changes: a fresh
//! `Running` opens a `running` session row, `Completed` closes it and credits
//! the task, `Abandoned` (or a reset while active) closes it as abandoned.

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{Database, SessionRecord, SessionStatus};
use crate::timer::{SessionTimer, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    ForceCompleted,
    Abandoned,
}

impl From<SessionOutcome> for SessionStatus {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Completed => SessionStatus::Completed,
            SessionOutcome::ForceCompleted => SessionStatus::ForceCompleted,
            SessionOutcome::Abandoned => SessionStatus::Abandoned,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    id: i64,
    task_id: Option<i64>,
    started_at: DateTime<Local>,
}

/// Bridges timer outcomes to the session history.
pub struct SessionRecorder<'a> {
    db: &'a Database,
    active: Option<ActiveSession>,
    force_next: bool,
}

impl<'a> SessionRecorder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            active: None,
            force_next: false,
        }
    }

    /// Id of the session row currently open, if any.
    pub fn active_session(&self) -> Option<i64> {
        self.active.map(|a| a.id)
    }

    /// Record the next completion as `force_completed`.
    pub fn mark_force_completed(&mut self) {
        self.force_next = true;
    }

    /// Feed a state change observed on `timer`.
    ///
    /// Returns the closed session when the change ended one.
    pub fn observe(
        &mut self,
        timer: &SessionTimer,
        state: TimerState,
    ) -> Result<Option<SessionRecord>> {
        match state {
            TimerState::Running if self.active.is_none() => {
                let started_at = timer.started_at().unwrap_or_else(Local::now);
                self.begin(timer.task_reference(), started_at, timer.duration())?;
                Ok(None)
            }
            TimerState::Completed => {
                let outcome = if std::mem::take(&mut self.force_next) {
                    SessionOutcome::ForceCompleted
                } else {
                    SessionOutcome::Completed
                };
                self.finish(outcome, Local::now())
            }
            TimerState::Abandoned | TimerState::Ready => {
                self.force_next = false;
                self.finish(SessionOutcome::Abandoned, Local::now())
            }
            TimerState::Running | TimerState::Paused => Ok(None),
        }
    }

    /// Open a `running` session row. A session left open is abandoned first.
    pub fn begin(
        &mut self,
        task_id: Option<i64>,
        started_at: DateTime<Local>,
        duration_secs: u64,
    ) -> Result<i64> {
        if self.active.is_some() {
            warn!("previous focus session still open; abandoning it");
            self.finish(SessionOutcome::Abandoned, started_at)?;
        }
        let id = self.db.begin_session(task_id, started_at, duration_secs)?;
        self.active = Some(ActiveSession {
            id,
            task_id,
            started_at,
        });
        debug!(session = id, task = ?task_id, "session recorded as running");
        Ok(id)
    }

    /// Close the open session. No-op when nothing is open.
    ///
    /// Counted outcomes also increment the task's pomodoros and append a
    /// completion entry to the work log.
    pub fn finish(
        &mut self,
        outcome: SessionOutcome,
        ended_at: DateTime<Local>,
    ) -> Result<Option<SessionRecord>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        let status = SessionStatus::from(outcome);
        self.db.end_session(active.id, status, ended_at)?;
        debug!(session = active.id, %status, "session closed");

        if status.is_counted() {
            self.credit(&active, ended_at)?;
        }
        self.db.get_session(active.id)
    }

    fn credit(&self, active: &ActiveSession, ended_at: DateTime<Local>) -> Result<()> {
        let started = active.started_at.format("%H:%M");
        let task = match active.task_id {
            Some(id) => self.db.get_task(id)?,
            None => None,
        };
        let content = match &task {
            Some(task) => {
                self.db.increment_task_pomodoros(task.id)?;
                format!(
                    "Completed focus session - [{}] {} (started {started})",
                    task.quadrant.name(),
                    task.description
                )
            }
            None => format!("Completed focus session (started {started})"),
        };
        self.db
            .insert_log(&content, task.as_ref().map(|t| t.id), ended_at)?;
        Ok(())
    }
}
