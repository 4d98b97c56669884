use super::session::TimerState;
use crate::events::TimerEvent;

type TickFn = Box<dyn FnMut(u64, u64)>;
type CompleteFn = Box<dyn FnMut()>;
type StateChangeFn = Box<dyn FnMut(TimerState)>;

/// Callbacks registered by the single observer of a session timer.
///
/// Callbacks are deliberately not `Send`: they only ever run on the thread
/// that owns the timer, which is what lets them touch UI-side state.
#[derive(Default)]
pub(super) struct Observer {
    on_tick: Option<TickFn>,
    on_complete: Option<CompleteFn>,
    on_state_change: Option<StateChangeFn>,
}

impl Observer {
    pub fn set_tick(&mut self, callback: TickFn) {
        self.on_tick = Some(callback);
    }

    pub fn set_complete(&mut self, callback: CompleteFn) {
        self.on_complete = Some(callback);
    }

    pub fn set_state_change(&mut self, callback: StateChangeFn) {
        self.on_state_change = Some(callback);
    }

    pub fn deliver(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { remaining, total } => {
                if let Some(cb) = self.on_tick.as_mut() {
                    cb(remaining, total);
                }
            }
            TimerEvent::StateChanged { state } => {
                if let Some(cb) = self.on_state_change.as_mut() {
                    cb(state);
                }
            }
            TimerEvent::Completed => {
                if let Some(cb) = self.on_complete.as_mut() {
                    cb();
                }
            }
        }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("on_tick", &self.on_tick.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
