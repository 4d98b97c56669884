//! Eisenhower-matrix tasks.
//!
//! Every task lives in exactly one [`Quadrant`] and accumulates completed
//! focus sessions in `actual_pomodoros`. Completed tasks are read-only.

mod manager;

pub use manager::{QuadrantSummary, TaskManager};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Eisenhower quadrant. Stored and serialized as its index `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Quadrant {
    /// Urgent and important
    UrgentImportant,
    /// Important, not urgent
    ImportantNotUrgent,
    /// Urgent, not important
    UrgentNotImportant,
    /// Neither urgent nor important
    Neither,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UrgentImportant,
        Quadrant::ImportantNotUrgent,
        Quadrant::UrgentNotImportant,
        Quadrant::Neither,
    ];

    pub fn index(self) -> i64 {
        match self {
            Quadrant::UrgentImportant => 0,
            Quadrant::ImportantNotUrgent => 1,
            Quadrant::UrgentNotImportant => 2,
            Quadrant::Neither => 3,
        }
    }

    /// Human-readable label.
    pub fn name(self) -> &'static str {
        match self {
            Quadrant::UrgentImportant => "Urgent & Important",
            Quadrant::ImportantNotUrgent => "Important, Not Urgent",
            Quadrant::UrgentNotImportant => "Urgent, Not Important",
            Quadrant::Neither => "Not Urgent, Not Important",
        }
    }

    /// Display color as `#RRGGBB`.
    pub fn color(self) -> &'static str {
        match self {
            Quadrant::UrgentImportant => "#FF6B6B",
            Quadrant::ImportantNotUrgent => "#FFD93D",
            Quadrant::UrgentNotImportant => "#4D96FF",
            Quadrant::Neither => "#A0A0A0",
        }
    }
}

impl TryFrom<i64> for Quadrant {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quadrant::UrgentImportant),
            1 => Ok(Quadrant::ImportantNotUrgent),
            2 => Ok(Quadrant::UrgentNotImportant),
            3 => Ok(Quadrant::Neither),
            other => Err(ValidationError::InvalidQuadrant(other)),
        }
    }
}

impl From<Quadrant> for i64 {
    fn from(quadrant: Quadrant) -> Self {
        quadrant.index()
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Local>,
    pub quadrant: Quadrant,
    pub estimated_pomodoros: u32,
    pub actual_pomodoros: u32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Local>>,
}

impl Task {
    /// Whole days between creation and completion; `None` while open.
    pub fn duration_days(&self) -> Option<i64> {
        if !self.is_completed {
            return None;
        }
        self.completed_at
            .map(|done| (done - self.created_at).num_days())
    }
}

/// Field changes applied by [`crate::Database::update_task`].
///
/// `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub estimated_pomodoros: Option<u32>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.quadrant.is_none() && self.estimated_pomodoros.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn quadrant_index_roundtrip() {
        for quadrant in Quadrant::ALL {
            assert_eq!(Quadrant::try_from(quadrant.index()).unwrap(), quadrant);
        }
    }

    #[test]
    fn quadrant_rejects_out_of_range() {
        assert_eq!(
            Quadrant::try_from(4),
            Err(ValidationError::InvalidQuadrant(4))
        );
        assert_eq!(
            Quadrant::try_from(-1),
            Err(ValidationError::InvalidQuadrant(-1))
        );
    }

    #[test]
    fn quadrant_serializes_as_index() {
        let json = serde_json::to_string(&Quadrant::UrgentNotImportant).unwrap();
        assert_eq!(json, "2");
        let parsed: Quadrant = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Quadrant::ImportantNotUrgent);
        assert!(serde_json::from_str::<Quadrant>("7").is_err());
    }

    #[test]
    fn quadrant_colors() {
        assert_eq!(Quadrant::UrgentImportant.color(), "#FF6B6B");
        assert_eq!(Quadrant::Neither.color(), "#A0A0A0");
    }

    #[test]
    fn duration_days_only_for_completed_tasks() {
        let created = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut task = Task {
            id: 1,
            description: "Write report".to_string(),
            created_at: created,
            quadrant: Quadrant::UrgentImportant,
            estimated_pomodoros: 2,
            actual_pomodoros: 0,
            is_completed: false,
            completed_at: None,
        };
        assert_eq!(task.duration_days(), None);

        task.is_completed = true;
        task.completed_at = Some(created + Duration::days(3) + Duration::hours(2));
        assert_eq!(task.duration_days(), Some(3));
    }

    #[test]
    fn empty_update() {
        assert!(TaskUpdate::default().is_empty());
        let update = TaskUpdate {
            estimated_pomodoros: Some(3),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
