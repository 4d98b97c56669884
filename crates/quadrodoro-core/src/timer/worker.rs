//! Background countdown worker and the monitor it shares with the caller.
//!
//! The caller thread and the worker only ever meet inside [`Monitor`]: a
//! mutex-guarded [`Shared`] block plus one condition variable that is
//! notified on every pause, resume and cancellation. Each worker is bound to
//! the `generation` that was current when it was spawned; bumping the
//! generation is the cancellation signal, so a worker that outlives its
//! bounded join can never act on a newer run.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use super::session::TimerState;
use crate::events::TimerEvent;

/// Length of one countdown step.
pub(super) const TICK: Duration = Duration::from_secs(1);

/// Upper bound on how long `stop`/`force_complete`/`reset` wait for the worker.
pub(super) const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub(super) struct Shared {
    pub state: TimerState,
    pub duration: u64,
    pub remaining: u64,
    pub paused: bool,
    pub generation: u64,
}

#[derive(Debug)]
pub(super) struct Monitor {
    shared: Mutex<Shared>,
    wake: Condvar,
}

impl Monitor {
    pub fn new(duration: u64) -> Self {
        Self {
            shared: Mutex::new(Shared {
                state: TimerState::Ready,
                duration,
                remaining: duration,
                paused: false,
                generation: 0,
            }),
            wake: Condvar::new(),
        }
    }

    /// No user code runs under this lock, so a poisoned guard still holds
    /// consistent data.
    pub fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notify(&self) {
        self.wake.notify_all();
    }

    /// Block while `generation` is current and the timer is paused.
    fn wait_while_paused<'a>(
        &self,
        guard: MutexGuard<'a, Shared>,
        generation: u64,
    ) -> MutexGuard<'a, Shared> {
        self.wake
            .wait_while(guard, |s| s.paused && s.generation == generation)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a spawned countdown thread.
#[derive(Debug)]
pub(super) struct Worker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
    generation: u64,
}

impl Worker {
    pub fn spawn(
        monitor: Arc<Monitor>,
        generation: u64,
        events: Sender<TimerEvent>,
    ) -> std::io::Result<Self> {
        let (exit_tx, exited) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(format!("focus-timer-{generation}"))
            .spawn(move || {
                // Dropped on every exit path, which disconnects `exited`.
                let _exit_guard = exit_tx;
                run(&monitor, generation, &events);
                debug!(generation, "timer worker exited");
            })?;
        debug!(generation, "timer worker spawned");
        Ok(Self {
            handle,
            exited,
            generation,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait up to `timeout` for the thread to finish.
    ///
    /// Returns `false` when the worker is still running after the timeout; it
    /// is then detached and exits on its own once it observes cancellation.
    pub fn join(self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!(generation = self.generation, "timer worker panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    generation = self.generation,
                    timeout_ms = timeout.as_millis() as u64,
                    "timer worker did not exit in time; detaching"
                );
                false
            }
        }
    }
}

/// Countdown loop. Every tick is sent after the decrement, so the last tick
/// of a run carries `remaining == 0`.
fn run(monitor: &Monitor, generation: u64, events: &Sender<TimerEvent>) {
    loop {
        {
            let shared = monitor.lock();
            let shared = monitor.wait_while_paused(shared, generation);
            if shared.generation != generation {
                return;
            }
            if shared.remaining == 0 {
                break;
            }
        }

        let Some(mut shared) = sleep_one_tick(monitor, generation) else {
            return;
        };
        shared.remaining = shared.remaining.saturating_sub(1);
        let tick = TimerEvent::Tick {
            remaining: shared.remaining,
            total: shared.duration,
        };
        drop(shared);
        // The receiver lives as long as the timer; a send error only means
        // the timer is being dropped.
        let _ = events.send(tick);
    }

    let mut shared = monitor.lock();
    if shared.generation != generation || shared.state != TimerState::Running {
        return;
    }
    shared.state = TimerState::Completed;
    shared.remaining = 0;
    drop(shared);
    debug!(generation, "focus session completed naturally");

    let _ = events.send(TimerEvent::StateChanged {
        state: TimerState::Completed,
    });
    let _ = events.send(TimerEvent::Completed);
}

/// Sleep for one tick of *running* time.
///
/// Pauses suspend the countdown without consuming the tick budget. Returns
/// the monitor guard so the caller can decrement without releasing the lock,
/// or `None` once the worker's generation has been cancelled.
fn sleep_one_tick(monitor: &Monitor, generation: u64) -> Option<MutexGuard<'_, Shared>> {
    let mut budget = TICK;
    let mut shared = monitor.lock();
    loop {
        if shared.generation != generation {
            return None;
        }
        if shared.paused {
            shared = monitor.wait_while_paused(shared, generation);
            continue;
        }
        if budget.is_zero() {
            return Some(shared);
        }
        let slept_from = Instant::now();
        let (guard, _) = monitor
            .wake
            .wait_timeout(shared, budget)
            .unwrap_or_else(PoisonError::into_inner);
        shared = guard;
        budget = budget.saturating_sub(slept_from.elapsed());
    }
}
