mod observer;
mod session;
mod worker;

pub use session::{
    format_clock, progress_percentage, SessionTimer, TimerState, DEFAULT_DURATION_SECS,
};
