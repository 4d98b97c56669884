use chrono::Local;
use serde::Serialize;
use tracing::debug;

use super::{Quadrant, Task, TaskUpdate};
use crate::error::{non_empty, CoreError, Result, ValidationError};
use crate::storage::Database;

/// Task counts for one quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuadrantSummary {
    pub quadrant: Quadrant,
    pub pending: u64,
    pub completed: u64,
    pub total: u64,
}

/// Validating front end for task storage.
///
/// Quadrants and estimates arrive as raw integers from user input and are
/// checked here before anything reaches the database.
pub struct TaskManager<'a> {
    db: &'a Database,
}

impl<'a> TaskManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a task and return it as stored.
    ///
    /// # Errors
    /// Fails on an empty description, a quadrant outside `0..=3` or a
    /// negative estimate.
    pub fn create_task(&self, description: &str, quadrant: i64, estimated: i64) -> Result<Task> {
        let quadrant = Quadrant::try_from(quadrant)?;
        let description = non_empty(description, "description")?;
        let estimated = estimate(estimated)?;

        let id = self
            .db
            .insert_task(description, quadrant, estimated, Local::now())?;
        debug!(id, quadrant = quadrant.index(), "task created");
        self.require(id)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        self.db.get_task(id)
    }

    /// Like [`get_task`](Self::get_task) but a missing task is an error.
    pub fn require(&self, id: i64) -> Result<Task> {
        self.db
            .get_task(id)?
            .ok_or(CoreError::NotFound { kind: "task", id })
    }

    pub fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>> {
        self.db.list_tasks(include_completed)
    }

    pub fn tasks_in_quadrant(&self, quadrant: i64, include_completed: bool) -> Result<Vec<Task>> {
        let quadrant = Quadrant::try_from(quadrant)?;
        self.db.list_tasks_by_quadrant(quadrant, include_completed)
    }

    pub fn completed_tasks(&self) -> Result<Vec<Task>> {
        self.db.list_completed_tasks(None)
    }

    /// Change the description and/or estimate of an open task.
    ///
    /// Returns `false` when neither field was given.
    pub fn update_task(
        &self,
        id: i64,
        description: Option<&str>,
        estimated: Option<i64>,
    ) -> Result<bool> {
        let task = self.require_open(id)?;
        let update = TaskUpdate {
            description: description
                .map(|d| non_empty(d, "description").map(str::to_string))
                .transpose()?,
            estimated_pomodoros: estimated.map(estimate).transpose()?,
            ..Default::default()
        };
        if update.is_empty() {
            return Ok(false);
        }
        self.db.update_task(task.id, &update)
    }

    /// Move an open task to another quadrant. Returns `false` if it is
    /// already there.
    pub fn move_task(&self, id: i64, quadrant: i64) -> Result<bool> {
        let quadrant = Quadrant::try_from(quadrant)?;
        let task = self.require_open(id)?;
        if task.quadrant == quadrant {
            return Ok(false);
        }
        let update = TaskUpdate {
            quadrant: Some(quadrant),
            ..Default::default()
        };
        self.db.update_task(id, &update)
    }

    /// Mark a task completed. Returns `false` if it already was.
    pub fn complete_task(&self, id: i64) -> Result<bool> {
        let task = self.require(id)?;
        if task.is_completed {
            return Ok(false);
        }
        self.db.complete_task(id, Local::now())
    }

    pub fn delete_task(&self, id: i64) -> Result<bool> {
        self.require(id)?;
        self.db.delete_task(id)
    }

    pub fn increment_pomodoros(&self, id: i64) -> Result<bool> {
        self.db.increment_task_pomodoros(id)
    }

    /// Days from creation to completion; `None` while the task is open.
    pub fn duration_days(&self, id: i64) -> Result<Option<i64>> {
        Ok(self.require(id)?.duration_days())
    }

    pub fn quadrant_summary(&self) -> Result<Vec<QuadrantSummary>> {
        let counts = self.db.task_counts_by_quadrant()?;
        Ok(Quadrant::ALL
            .iter()
            .zip(counts)
            .map(|(&quadrant, (total, completed))| QuadrantSummary {
                quadrant,
                pending: total - completed,
                completed,
                total,
            })
            .collect())
    }

    fn require_open(&self, id: i64) -> Result<Task> {
        let task = self.require(id)?;
        if task.is_completed {
            return Err(ValidationError::TaskCompleted(id).into());
        }
        Ok(task)
    }
}

fn estimate(value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeEstimate(value));
    }
    u32::try_from(value).map_err(|_| ValidationError::InvalidValue {
        field: "estimated_pomodoros",
        message: format!("{value} is too large"),
    })
}
