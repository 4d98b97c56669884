//! # Quadrodoro Core Library
//!
//! Core logic for Quadrodoro, a focus timer paired with an Eisenhower-matrix
//! task list. Everything is available through the standalone `quadrodoro`
//! CLI, which is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Session timer**: a countdown state machine with a background worker
//!   thread; observer callbacks run only on the owning thread
//! - **Storage**: SQLite persistence for tasks, sessions, the work log and
//!   daily reflections, plus TOML configuration
//! - **Managers**: validating front ends for tasks and the work log
//! - **Statistics**: daily, weekly and monthly views, streaks, quadrant
//!   distribution and calendar grids
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: focus session state machine
//! - [`SessionRecorder`]: persists timer outcomes
//! - [`Database`]: SQLite repository
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod recorder;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod worklog;

pub use error::{ConfigError, CoreError, DatabaseError, Result, TimerError, ValidationError};
pub use events::TimerEvent;
pub use recorder::{SessionOutcome, SessionRecorder};
pub use stats::{
    DailyStatistics, DayCount, MonthlyStatistics, QuadrantDistribution, Statistics, Streak,
    TaskStatistics,
};
pub use storage::{Config, Database, LogEntry, Reflection, SessionRecord, SessionStatus};
pub use task::{Quadrant, QuadrantSummary, Task, TaskManager, TaskUpdate};
pub use timer::{SessionTimer, TimerState};
pub use worklog::LogManager;
