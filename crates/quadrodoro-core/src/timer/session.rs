//! Focus session timer.
//!
//! A countdown state machine driven by a background worker thread. Commands
//! are issued from the owning thread; the worker only decrements the shared
//! countdown and queues notifications. Observer callbacks never run on the
//! worker: they fire when the owner pumps the queue with
//! [`SessionTimer::dispatch_pending`] or [`SessionTimer::wait_and_dispatch`],
//! or synchronously for transitions the owner triggers itself.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Running -> (Paused | Completed | Abandoned)
//! Paused -> (Running | Completed | Abandoned)
//! Completed | Abandoned -> Running (start) | Ready (reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = SessionTimer::new(25 * 60);
//! timer.on_complete(|| println!("done"));
//! timer.start();
//! // In the UI loop:
//! timer.wait_and_dispatch(Duration::from_millis(250));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::observer::Observer;
use super::worker::{Monitor, Worker, JOIN_TIMEOUT};
use crate::error::TimerError;
use crate::events::TimerEvent;

/// Default focus length when nothing else is configured.
pub const DEFAULT_DURATION_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Ready,
    Running,
    Paused,
    Completed,
    Abandoned,
}

impl TimerState {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Ready => "ready",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Completed => "completed",
            TimerState::Abandoned => "abandoned",
        }
    }

    /// A run is in progress and owns a worker.
    fn is_active(self) -> bool {
        matches!(self, TimerState::Running | TimerState::Paused)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Countdown timer for one focus session at a time.
///
/// Created once and reused: `start()` from `Completed`/`Abandoned` begins a
/// fresh run, `reset()` returns to `Ready`.
pub struct SessionTimer {
    monitor: Arc<Monitor>,
    worker: Option<Worker>,
    task_reference: Option<i64>,
    started_at: Option<DateTime<Local>>,
    events_tx: Sender<TimerEvent>,
    events_rx: Receiver<TimerEvent>,
    observer: Observer,
}

impl SessionTimer {
    /// Create a timer in `Ready`. A zero duration is clamped to one second.
    pub fn new(duration_secs: u64) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            monitor: Arc::new(Monitor::new(duration_secs.max(1))),
            worker: None,
            task_reference: None,
            started_at: None,
            events_tx,
            events_rx,
            observer: Observer::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.monitor.lock().state
    }

    pub fn remaining(&self) -> u64 {
        self.monitor.lock().remaining
    }

    pub fn duration(&self) -> u64 {
        self.monitor.lock().duration
    }

    pub fn task_reference(&self) -> Option<i64> {
        self.task_reference
    }

    /// When the current run began. Not updated on resume.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == TimerState::Paused
    }

    /// Remaining time as `MM:SS`; minutes are not wrapped into hours.
    pub fn formatted_remaining(&self) -> String {
        format_clock(self.remaining())
    }

    /// 0.0 .. 100.0 progress through the current run.
    pub fn progress_percentage(&self) -> f64 {
        let shared = self.monitor.lock();
        progress_percentage(shared.duration, shared.remaining)
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Change the run length.
    ///
    /// # Errors
    /// Returns [`TimerError::PreconditionViolation`] while a run is ticking.
    pub fn set_duration(&mut self, seconds: u64) -> Result<(), TimerError> {
        let mut shared = self.monitor.lock();
        if shared.state == TimerState::Running {
            return Err(TimerError::PreconditionViolation {
                operation: "change the duration",
                state: shared.state,
            });
        }
        shared.duration = seconds.max(1);
        shared.remaining = if shared.state == TimerState::Ready {
            shared.duration
        } else {
            shared.remaining.min(shared.duration)
        };
        Ok(())
    }

    /// Associate the next run with a task. The reference is not validated.
    ///
    /// # Errors
    /// Returns [`TimerError::PreconditionViolation`] while a run is ticking.
    pub fn set_task_reference(&mut self, reference: Option<i64>) -> Result<(), TimerError> {
        let state = self.state();
        if state == TimerState::Running {
            return Err(TimerError::PreconditionViolation {
                operation: "change the task",
                state,
            });
        }
        self.task_reference = reference;
        Ok(())
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Called with `(remaining, total)` once per elapsed second.
    pub fn on_tick(&mut self, callback: impl FnMut(u64, u64) + 'static) {
        self.observer.set_tick(Box::new(callback));
    }

    pub fn on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.observer.set_complete(Box::new(callback));
    }

    pub fn on_state_change(&mut self, callback: impl FnMut(TimerState) + 'static) {
        self.observer.set_state_change(Box::new(callback));
    }

    /// Deliver every queued worker notification to the callbacks.
    /// Returns how many notifications were delivered.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.observer.deliver(event);
            delivered += 1;
        }
        delivered
    }

    /// Block up to `timeout` for the next worker notification, then deliver
    /// it together with anything queued behind it.
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.observer.deliver(event);
                1 + self.dispatch_pending()
            }
            Err(_) => 0,
        }
    }

    /// Readiness handle for event loops that multiplex the timer with other
    /// sources (`crossbeam_channel::Select`). Only wait on it; receive
    /// through [`dispatch_pending`](Self::dispatch_pending) so the callbacks
    /// see every notification.
    pub fn notifications(&self) -> Receiver<TimerEvent> {
        self.events_rx.clone()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new run, or resume a paused one.
    ///
    /// Returns `false` if a run is already ticking.
    pub fn start(&mut self) -> bool {
        let mut shared = self.monitor.lock();
        match shared.state {
            TimerState::Running => false,
            TimerState::Paused => {
                shared.state = TimerState::Running;
                shared.paused = false;
                drop(shared);
                self.monitor.notify();
                debug!("focus session resumed");
                self.emit(TimerEvent::StateChanged {
                    state: TimerState::Running,
                });
                true
            }
            TimerState::Ready | TimerState::Completed | TimerState::Abandoned => {
                drop(shared);
                self.begin_run()
            }
        }
    }

    pub fn pause(&mut self) -> bool {
        let mut shared = self.monitor.lock();
        if shared.state != TimerState::Running {
            return false;
        }
        shared.state = TimerState::Paused;
        shared.paused = true;
        drop(shared);
        self.monitor.notify();
        debug!("focus session paused");
        self.emit(TimerEvent::StateChanged {
            state: TimerState::Paused,
        });
        true
    }

    /// Same as [`start`](Self::start); named for call sites resuming a pause.
    pub fn resume(&mut self) -> bool {
        self.start()
    }

    /// End the active run early.
    ///
    /// With `abandon` the run ends in `Abandoned`; otherwise it ends in
    /// `Completed` and the completion callback fires before this returns.
    pub fn stop(&mut self, abandon: bool) -> bool {
        let target = if abandon {
            TimerState::Abandoned
        } else {
            TimerState::Completed
        };
        self.halt(target, false)
    }

    /// Mark the active run as finished with nothing remaining.
    pub fn force_complete(&mut self) -> bool {
        self.halt(TimerState::Completed, true)
    }

    /// Abandon any active run and return to `Ready` with a full countdown.
    pub fn reset(&mut self) {
        if self.state().is_active() {
            self.stop(true);
        }
        self.retire_worker();

        let previous = {
            let mut shared = self.monitor.lock();
            let previous = shared.state;
            shared.state = TimerState::Ready;
            shared.paused = false;
            shared.remaining = shared.duration;
            previous
        };
        self.started_at = None;
        if previous != TimerState::Ready {
            self.emit(TimerEvent::StateChanged {
                state: TimerState::Ready,
            });
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_run(&mut self) -> bool {
        // Cancel the previous worker, if any, before its successor exists.
        let generation = {
            let mut shared = self.monitor.lock();
            shared.generation += 1;
            shared.paused = false;
            shared.generation
        };
        self.monitor.notify();
        self.retire_worker();

        let (previous_state, previous_remaining) = {
            let mut shared = self.monitor.lock();
            let previous = (shared.state, shared.remaining);
            shared.remaining = shared.duration;
            shared.state = TimerState::Running;
            previous
        };

        match Worker::spawn(
            Arc::clone(&self.monitor),
            generation,
            self.events_tx.clone(),
        ) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.started_at = Some(Local::now());
                debug!(
                    generation,
                    duration = self.duration(),
                    task = ?self.task_reference,
                    "focus session started"
                );
                self.emit(TimerEvent::StateChanged {
                    state: TimerState::Running,
                });
                true
            }
            Err(err) => {
                error!(%err, "failed to spawn timer worker");
                let mut shared = self.monitor.lock();
                shared.state = previous_state;
                shared.remaining = previous_remaining;
                false
            }
        }
    }

    /// Cancel the active run, wait for the worker, and settle in `target`.
    fn halt(&mut self, target: TimerState, clear_remaining: bool) -> bool {
        {
            let mut shared = self.monitor.lock();
            if !shared.state.is_active() {
                return false;
            }
            shared.generation += 1;
            shared.paused = false;
            shared.state = target;
            if clear_remaining {
                shared.remaining = 0;
            }
        }
        self.monitor.notify();
        self.retire_worker();
        debug!(state = %target, "focus session halted");

        self.emit(TimerEvent::StateChanged { state: target });
        if target == TimerState::Completed {
            self.emit(TimerEvent::Completed);
        }
        true
    }

    fn retire_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join(JOIN_TIMEOUT);
        }
    }

    /// Deliver an owner-side notification after anything the worker queued
    /// earlier, keeping callbacks in causal order.
    fn emit(&mut self, event: TimerEvent) {
        self.dispatch_pending();
        self.observer.deliver(event);
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.monitor.lock().generation += 1;
            self.monitor.notify();
            self.retire_worker();
        }
    }
}

impl fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.monitor.lock();
        f.debug_struct("SessionTimer")
            .field("state", &shared.state)
            .field("duration", &shared.duration)
            .field("remaining", &shared.remaining)
            .field("task_reference", &self.task_reference)
            .field("started_at", &self.started_at)
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}

/// Format seconds as zero-padded `MM:SS` (`3661` -> `"61:01"`).
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Elapsed share of `duration`, clamped to `0.0 ..= 100.0`.
pub fn progress_percentage(duration: u64, remaining: u64) -> f64 {
    if duration == 0 {
        return 0.0;
    }
    let elapsed = duration.saturating_sub(remaining);
    (elapsed as f64 / duration as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Instant;

    fn completion_counter(timer: &mut SessionTimer) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        timer.on_complete(move || sink.set(sink.get() + 1));
        count
    }

    fn worker_generation(timer: &SessionTimer) -> Option<u64> {
        timer.worker.as_ref().map(Worker::generation)
    }

    #[test]
    fn initial_state() {
        let timer = SessionTimer::new(DEFAULT_DURATION_SECS);
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.duration(), DEFAULT_DURATION_SECS);
        assert_eq!(timer.remaining(), DEFAULT_DURATION_SECS);
        assert_eq!(timer.task_reference(), None);
        assert!(timer.started_at().is_none());
        assert!(!timer.is_running());
        assert!(!timer.is_paused());
        assert_eq!(timer.formatted_remaining(), "30:00");
    }

    #[test]
    fn set_duration_clamps_zero_to_one() {
        let mut timer = SessionTimer::new(60);
        timer.set_duration(0).unwrap();
        assert_eq!(timer.duration(), 1);
        assert_eq!(timer.remaining(), 1);
    }

    #[test]
    fn set_duration_rejected_while_running() {
        let mut timer = SessionTimer::new(3600);
        assert!(timer.start());
        let err = timer.set_duration(10).unwrap_err();
        assert_eq!(
            err,
            TimerError::PreconditionViolation {
                operation: "change the duration",
                state: TimerState::Running,
            }
        );
        assert_eq!(timer.duration(), 3600);
        timer.stop(true);
    }

    #[test]
    fn set_task_reference_rejected_while_running() {
        let mut timer = SessionTimer::new(3600);
        assert!(timer.start());
        assert!(timer.set_task_reference(Some(5)).is_err());
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.task_reference(), None);
        timer.stop(true);
    }

    #[test]
    fn set_duration_while_paused_keeps_remaining_in_range() {
        let mut timer = SessionTimer::new(3600);
        timer.start();
        timer.pause();
        timer.set_duration(10).unwrap();
        assert_eq!(timer.duration(), 10);
        assert!(timer.remaining() <= 10);
        timer.set_task_reference(Some(7)).unwrap();
        assert_eq!(timer.task_reference(), Some(7));
        timer.reset();
    }

    #[test]
    fn pause_from_ready_fails() {
        let mut timer = SessionTimer::new(60);
        assert!(!timer.pause());
        assert_eq!(timer.state(), TimerState::Ready);
    }

    #[test]
    fn second_pause_fails() {
        let mut timer = SessionTimer::new(3600);
        timer.start();
        assert!(timer.pause());
        assert!(!timer.pause());
        assert_eq!(timer.state(), TimerState::Paused);
        timer.reset();
    }

    #[test]
    fn start_while_running_fails() {
        let mut timer = SessionTimer::new(3600);
        assert!(timer.start());
        let generation = worker_generation(&timer);
        assert!(!timer.start());
        assert_eq!(worker_generation(&timer), generation);
        timer.stop(true);
    }

    #[test]
    fn pause_resume_keeps_worker_and_countdown() {
        let mut timer = SessionTimer::new(3600);
        timer.start();
        let started_at = timer.started_at();
        let generation = worker_generation(&timer);

        assert!(timer.pause());
        assert!(timer.is_paused());
        assert!(timer.resume());
        assert!(timer.is_running());

        assert_eq!(worker_generation(&timer), generation);
        assert_eq!(timer.remaining(), 3600);
        assert_eq!(timer.started_at(), started_at);
        timer.stop(true);
    }

    #[test]
    fn paused_time_does_not_count_down() {
        let mut timer = SessionTimer::new(2);
        timer.start();
        timer.pause();
        std::thread::sleep(Duration::from_millis(1300));
        assert_eq!(timer.remaining(), 2);
        assert_eq!(timer.state(), TimerState::Paused);
        timer.reset();
    }

    #[test]
    fn stop_abandon_skips_completion() {
        let mut timer = SessionTimer::new(60);
        let completions = completion_counter(&mut timer);
        timer.start();
        assert!(timer.stop(true));
        timer.dispatch_pending();
        assert_eq!(timer.state(), TimerState::Abandoned);
        assert_eq!(completions.get(), 0);
        assert!(timer.worker.is_none());
    }

    #[test]
    fn stop_complete_fires_completion_synchronously() {
        let mut timer = SessionTimer::new(60);
        let completions = completion_counter(&mut timer);
        timer.start();
        assert!(timer.stop(false));
        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn stop_outside_a_run_fails() {
        let mut timer = SessionTimer::new(60);
        assert!(!timer.stop(true));
        assert!(!timer.force_complete());
        assert_eq!(timer.state(), TimerState::Ready);
    }

    #[test]
    fn force_complete_from_paused() {
        let mut timer = SessionTimer::new(60);
        let completions = completion_counter(&mut timer);
        timer.start();
        timer.pause();
        assert!(timer.force_complete());
        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(timer.remaining(), 0);
        timer.dispatch_pending();
        assert_eq!(completions.get(), 1);
        assert_eq!(timer.progress_percentage(), 100.0);
    }

    #[test]
    fn reset_from_any_state_returns_to_ready() {
        let mut timer = SessionTimer::new(90);

        timer.reset();
        assert_eq!(timer.state(), TimerState::Ready);

        timer.start();
        timer.reset();
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.remaining(), 90);

        timer.start();
        timer.pause();
        timer.reset();
        assert_eq!(timer.state(), TimerState::Ready);

        timer.start();
        timer.force_complete();
        timer.reset();
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.remaining(), 90);
        assert!(timer.started_at().is_none());

        timer.start();
        timer.stop(true);
        timer.reset();
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.remaining(), 90);
    }

    #[test]
    fn reset_does_not_fire_completion() {
        let mut timer = SessionTimer::new(60);
        let completions = completion_counter(&mut timer);
        timer.start();
        timer.reset();
        timer.dispatch_pending();
        assert_eq!(completions.get(), 0);
    }

    #[test]
    fn natural_run_ticks_once_per_second_then_completes() {
        let mut timer = SessionTimer::new(2);
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&ticks);
        timer.on_tick(move |remaining, total| sink.borrow_mut().push((remaining, total)));
        let completions = completion_counter(&mut timer);

        timer.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while completions.get() == 0 && Instant::now() < deadline {
            timer.wait_and_dispatch(Duration::from_millis(200));
        }

        assert_eq!(*ticks.borrow(), vec![(1, 2), (0, 2)]);
        assert_eq!(completions.get(), 1);
        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn one_second_run_completes_without_intervention() {
        let mut timer = SessionTimer::new(1);
        let completions = completion_counter(&mut timer);
        timer.start();
        std::thread::sleep(Duration::from_secs(2));

        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(timer.remaining(), 0);
        // Worker-side completion waits in the queue for the owner.
        assert_eq!(completions.get(), 0);
        timer.dispatch_pending();
        assert_eq!(completions.get(), 1);
        timer.dispatch_pending();
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn callbacks_run_on_the_owner_thread() {
        let owner = std::thread::current().id();
        let mut timer = SessionTimer::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        timer.on_tick(move |_, _| sink.borrow_mut().push(std::thread::current().id()));

        timer.start();
        timer.wait_and_dispatch(Duration::from_secs(3));

        assert!(!seen.borrow().is_empty());
        assert!(seen.borrow().iter().all(|id| *id == owner));
    }

    #[test]
    fn state_changes_are_reported_in_order() {
        let mut timer = SessionTimer::new(60);
        let states = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&states);
        timer.on_state_change(move |state| sink.borrow_mut().push(state));

        timer.start();
        timer.pause();
        timer.resume();
        timer.stop(true);
        timer.reset();

        assert_eq!(
            *states.borrow(),
            vec![
                TimerState::Running,
                TimerState::Paused,
                TimerState::Running,
                TimerState::Abandoned,
                TimerState::Ready,
            ]
        );
    }

    #[test]
    fn restart_after_completion_begins_fresh_run() {
        let mut timer = SessionTimer::new(45);
        timer.start();
        let first = worker_generation(&timer);
        timer.force_complete();
        assert_eq!(timer.remaining(), 0);

        assert!(timer.start());
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.remaining(), 45);
        assert_ne!(worker_generation(&timer), first);
        timer.stop(true);
    }

    #[test]
    fn formatted_remaining_allows_minutes_past_an_hour() {
        assert_eq!(format_clock(3661), "61:01");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
    }

    #[test]
    fn progress_guards_zero_duration() {
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert_eq!(progress_percentage(100, 25), 75.0);
    }

    proptest! {
        #[test]
        fn progress_is_always_a_percentage(duration in 0u64..1_000_000, remaining in 0u64..2_000_000) {
            let pct = progress_percentage(duration, remaining);
            prop_assert!((0.0..=100.0).contains(&pct));
        }

        #[test]
        fn clock_round_trips_to_seconds(seconds in 0u64..360_000) {
            let clock = format_clock(seconds);
            let (minutes, secs) = clock.split_once(':').unwrap();
            prop_assert_eq!(secs.len(), 2);
            prop_assert!(minutes.len() >= 2);
            let minutes: u64 = minutes.parse().unwrap();
            let secs: u64 = secs.parse().unwrap();
            prop_assert_eq!(minutes * 60 + secs, seconds);
        }

        #[test]
        fn set_duration_never_stores_zero(seconds in 0u64..10_000) {
            let mut timer = SessionTimer::new(60);
            timer.set_duration(seconds).unwrap();
            prop_assert_eq!(timer.duration(), seconds.max(1));
            prop_assert_eq!(timer.remaining(), timer.duration());
        }
    }
}
