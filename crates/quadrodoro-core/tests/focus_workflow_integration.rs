//! Integration tests for a focus session from timer start to statistics.
//!
//! Drives a real one-second countdown, records it through the
//! `SessionRecorder` and checks the resulting history.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Local;
use quadrodoro_core::{
    Database, LogManager, SessionRecorder, SessionStatus, SessionTimer, Statistics, TaskManager,
    TimerState,
};

/// Feed every queued state change to the recorder.
fn settle(
    changes: &RefCell<Vec<TimerState>>,
    timer: &SessionTimer,
    recorder: &mut SessionRecorder<'_>,
) {
    let drained: Vec<_> = changes.borrow_mut().drain(..).collect();
    for state in drained {
        recorder.observe(timer, state).unwrap();
    }
}

/// Pump the timer until it leaves `Running`, feeding every state change to
/// the recorder.
fn run_to_end(
    timer: &mut SessionTimer,
    recorder: &mut SessionRecorder<'_>,
    changes: &Rc<RefCell<Vec<TimerState>>>,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        timer.wait_and_dispatch(Duration::from_millis(100));
        settle(changes, timer, recorder);
        if timer.state() != TimerState::Running {
            break;
        }
        assert!(Instant::now() < deadline, "timer never completed");
    }
}

#[test]
fn test_natural_completion_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("focus.db")).unwrap();
    let task = TaskManager::new(&db)
        .create_task("Write release notes", 0, 1)
        .unwrap();

    let changes = Rc::new(RefCell::new(Vec::new()));
    let ticks = Rc::new(RefCell::new(Vec::new()));
    let mut timer = SessionTimer::new(1);
    timer.set_task_reference(Some(task.id)).unwrap();
    {
        let changes = Rc::clone(&changes);
        timer.on_state_change(move |state| changes.borrow_mut().push(state));
        let ticks = Rc::clone(&ticks);
        timer.on_tick(move |remaining, total| ticks.borrow_mut().push((remaining, total)));
    }
    let mut recorder = SessionRecorder::new(&db);

    assert!(timer.start());
    run_to_end(&mut timer, &mut recorder, &changes);

    assert_eq!(timer.state(), TimerState::Completed);
    assert_eq!(*ticks.borrow(), vec![(0, 1)]);
    assert!(recorder.active_session().is_none());

    let sessions = db.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
    assert_eq!(sessions[0].task_id, Some(task.id));

    let stored = TaskManager::new(&db).require(task.id).unwrap();
    assert_eq!(stored.actual_pomodoros, 1);

    let today = Local::now().date_naive();
    let daily = Statistics::new(&db).daily(today).unwrap();
    assert_eq!(daily.total_pomodoros, 1);
    assert_eq!(daily.logs.len(), 1);
    assert!(daily.logs[0]
        .content
        .starts_with("Completed focus session - [Urgent & Important] Write release notes"));

    let streak = Statistics::new(&db).streak().unwrap();
    assert_eq!(streak.current, 1);
}

#[test]
fn test_abandoned_run_is_not_counted() {
    let db = Database::open_memory().unwrap();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let mut timer = SessionTimer::new(60);
    {
        let changes = Rc::clone(&changes);
        timer.on_state_change(move |state| changes.borrow_mut().push(state));
    }
    let mut recorder = SessionRecorder::new(&db);

    assert!(timer.start());
    assert!(timer.pause());
    assert!(timer.stop(true));

    let drained: Vec<_> = changes.borrow_mut().drain(..).collect();
    assert_eq!(
        drained,
        vec![TimerState::Running, TimerState::Paused, TimerState::Abandoned]
    );
    for state in drained {
        recorder.observe(&timer, state).unwrap();
    }

    let sessions = db.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Abandoned);
    assert_eq!(db.total_pomodoros().unwrap(), 0);
    assert!(LogManager::new(&db).today().unwrap().is_empty());
}

#[test]
fn test_restart_records_a_second_session() {
    let db = Database::open_memory().unwrap();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let mut timer = SessionTimer::new(60);
    {
        let changes = Rc::clone(&changes);
        timer.on_state_change(move |state| changes.borrow_mut().push(state));
    }
    let mut recorder = SessionRecorder::new(&db);

    timer.start();
    timer.stop(false);
    settle(&changes, &timer, &mut recorder);

    timer.start();
    assert!(timer.force_complete());
    recorder.mark_force_completed();
    settle(&changes, &timer, &mut recorder);

    let statuses: Vec<_> = db
        .list_sessions()
        .unwrap()
        .into_iter()
        .map(|s| s.status)
        .collect();
    assert_eq!(
        statuses,
        vec![SessionStatus::Completed, SessionStatus::ForceCompleted]
    );
    assert_eq!(db.total_pomodoros().unwrap(), 2);
}
