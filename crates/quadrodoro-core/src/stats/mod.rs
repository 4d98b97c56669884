//! Statistics over focus sessions and tasks.
//!
//! Only sessions that ended `completed` or `force_completed` count as
//! pomodoros. Daily views read a date; streaks compare against today's
//! local date.

mod calendar;
mod streak;

pub use calendar::{days_in_month, month_grid, Week};
pub use streak::{productivity_streak, Streak};

use std::collections::BTreeMap;

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::{Database, LogEntry, Reflection, SessionRecord};
use crate::task::{Quadrant, Task};

/// A task completed on the reported day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedTask {
    pub id: i64,
    pub description: String,
    pub quadrant: Quadrant,
    /// Pomodoros spent on the task that same day.
    pub pomodoros: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub total_pomodoros: u64,
    pub completed_tasks: Vec<CompletedTask>,
    /// Open tasks at the end of the day, indexed by quadrant.
    pub pending_by_quadrant: [u64; 4],
    pub logs: Vec<LogEntry>,
    pub reflection: Option<Reflection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub pomodoros: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStatistics {
    pub year: i32,
    pub month: u32,
    /// Pomodoros per day of month. Days without any are absent.
    pub daily_counts: BTreeMap<u32, u64>,
    pub total_pomodoros: u64,
    pub active_days: u32,
}

impl MonthlyStatistics {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            daily_counts: BTreeMap::new(),
            total_pomodoros: 0,
            active_days: 0,
        }
    }

    pub fn add_day(&mut self, day: u32, pomodoros: u64) {
        if let Some(previous) = self.daily_counts.insert(day, pomodoros) {
            self.total_pomodoros -= previous;
            if previous > 0 {
                self.active_days -= 1;
            }
        }
        self.total_pomodoros += pomodoros;
        if pomodoros > 0 {
            self.active_days += 1;
        }
    }

    /// Mean pomodoros over days that had any; 0 for an empty month.
    pub fn average_per_active_day(&self) -> f64 {
        if self.active_days == 0 {
            return 0.0;
        }
        self.total_pomodoros as f64 / f64::from(self.active_days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatistics {
    pub task: Task,
    /// Finished sessions recorded against the task.
    pub pomodoros: u64,
    pub sessions: Vec<SessionRecord>,
    pub duration_days: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuadrantDistribution {
    pub quadrant: Quadrant,
    pub pending: u64,
    pub completed: u64,
    pub total: u64,
    /// Percentage, rounded to two decimals.
    pub completion_rate: f64,
}

/// Read-only statistics over a [`Database`].
pub struct Statistics<'a> {
    db: &'a Database,
}

impl<'a> Statistics<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn daily(&self, date: NaiveDate) -> Result<DailyStatistics> {
        let sessions = self.db.completed_sessions_on(date)?;
        let mut per_task: BTreeMap<i64, u64> = BTreeMap::new();
        for session in &sessions {
            if let Some(task_id) = session.task_id {
                *per_task.entry(task_id).or_default() += 1;
            }
        }

        let completed_tasks = self
            .db
            .list_completed_tasks(Some(date))?
            .into_iter()
            .map(|task| CompletedTask {
                pomodoros: per_task.get(&task.id).copied().unwrap_or(0),
                id: task.id,
                description: task.description,
                quadrant: task.quadrant,
            })
            .collect();

        Ok(DailyStatistics {
            date,
            total_pomodoros: sessions.len() as u64,
            completed_tasks,
            pending_by_quadrant: self.db.pending_counts_by_quadrant(Some(date))?,
            logs: self.db.logs_on(date)?,
            reflection: self.db.get_reflection(date)?,
        })
    }

    /// Seven consecutive days starting at `start`.
    pub fn weekly(&self, start: NaiveDate) -> Result<Vec<DayCount>> {
        (0..7)
            .map(|offset| -> Result<DayCount> {
                let date = start + Duration::days(offset);
                Ok(DayCount {
                    date,
                    pomodoros: self.db.daily_pomodoro_count(date)?,
                })
            })
            .collect()
    }

    pub fn monthly(&self, year: i32, month: u32) -> Result<MonthlyStatistics> {
        check_month(year, month)?;
        let mut stats = MonthlyStatistics::new(year, month);
        for (day, count) in self.db.monthly_pomodoro_counts(year, month)? {
            stats.add_day(day, count);
        }
        Ok(stats)
    }

    pub fn task(&self, task_id: i64) -> Result<TaskStatistics> {
        let task = self.db.get_task(task_id)?.ok_or(CoreError::NotFound {
            kind: "task",
            id: task_id,
        })?;
        let sessions = self.db.completed_sessions_for_task(task_id)?;
        Ok(TaskStatistics {
            pomodoros: sessions.len() as u64,
            duration_days: task.duration_days(),
            task,
            sessions,
        })
    }

    /// Pomodoros between two dates, both inclusive; `None` leaves that end open.
    pub fn total(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<u64> {
        self.db.pomodoros_between(start, end)
    }

    pub fn streak(&self) -> Result<Streak> {
        self.streak_as_of(Local::now().date_naive())
    }

    pub fn streak_as_of(&self, today: NaiveDate) -> Result<Streak> {
        let dates = self.db.pomodoro_dates()?;
        Ok(productivity_streak(&dates, today))
    }

    pub fn quadrant_distribution(&self) -> Result<Vec<QuadrantDistribution>> {
        let counts = self.db.task_counts_by_quadrant()?;
        Ok(Quadrant::ALL
            .iter()
            .zip(counts)
            .map(|(&quadrant, (total, completed))| QuadrantDistribution {
                quadrant,
                pending: total - completed,
                completed,
                total,
                completion_rate: completion_rate(completed, total),
            })
            .collect())
    }

    /// Monday-first month grid of daily pomodoro counts.
    pub fn calendar(&self, year: i32, month: u32) -> Result<Vec<Week>> {
        check_month(year, month)?;
        let counts = self.db.monthly_pomodoro_counts(year, month)?;
        month_grid(year, month, &counts).ok_or_else(|| invalid_month(month).into())
    }
}

fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = completed as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

fn check_month(year: i32, month: u32) -> Result<(), ValidationError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|_| ())
        .ok_or_else(|| invalid_month(month))
}

fn invalid_month(month: u32) -> ValidationError {
    ValidationError::InvalidValue {
        field: "month",
        message: format!("{month} is not a month between 1 and 12"),
    }
}
