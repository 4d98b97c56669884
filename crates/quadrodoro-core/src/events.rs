use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Notifications produced by the session timer.
///
/// Worker-side events travel through the timer's notification queue and are
/// only handed to observer callbacks when the observer pumps the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// One second elapsed. `remaining` is the value after the decrement.
    Tick { remaining: u64, total: u64 },
    StateChanged { state: TimerState },
    /// The focus session reached `Completed`.
    Completed,
}
