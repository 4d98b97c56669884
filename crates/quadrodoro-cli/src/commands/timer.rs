//! Foreground focus session.
//!
//! The main thread owns the [`SessionTimer`] and multiplexes two sources:
//! timer notifications from the worker thread and line commands read from
//! stdin on a helper thread.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::Duration;

use clap::Subcommand;
use crossbeam_channel::{Receiver, Select, TryRecvError};
use quadrodoro_core::timer::{format_clock, progress_percentage};
use quadrodoro_core::{
    Config, Database, SessionRecord, SessionRecorder, SessionTimer, TaskManager, TimerEvent,
    TimerState, ValidationError,
};

use super::CommandResult;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a focus session in the foreground
    ///
    /// Commands on stdin: p pause, r resume, s stop (abandon),
    /// d done (stop as completed), f force-complete, q quit.
    Run {
        /// Session length in seconds (overrides config and environment)
        #[arg(long)]
        duration: Option<u64>,
        /// Task to credit when the session completes
        #[arg(long)]
        task: Option<i64>,
        /// Print one JSON event per line instead of a countdown
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TimerAction) -> CommandResult {
    match action {
        TimerAction::Run {
            duration,
            task,
            json,
        } => run_session(duration, task, json),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
    Done,
    ForceComplete,
    Quit,
}

impl Command {
    fn name(self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Done => "finish",
            Command::ForceComplete => "force-complete",
            Command::Quit => "quit",
        }
    }

    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "p" | "pause" => Some(Command::Pause),
            "r" | "resume" => Some(Command::Resume),
            "s" | "stop" => Some(Command::Stop),
            "d" | "done" => Some(Command::Done),
            "f" | "force" => Some(Command::ForceComplete),
            "q" | "quit" => Some(Command::Quit),
            _ => None,
        }
    }
}

fn run_session(duration: Option<u64>, task: Option<i64>, json: bool) -> CommandResult {
    let db = Database::open()?;
    let duration = match duration {
        Some(secs) => secs,
        None => Config::load()?.timer_duration(),
    };
    if let Some(id) = task {
        let task = TaskManager::new(&db).require(id)?;
        if task.is_completed {
            return Err(ValidationError::TaskCompleted(id).into());
        }
    }

    let events: Rc<RefCell<VecDeque<TimerEvent>>> = Rc::default();
    let mut timer = SessionTimer::new(duration);
    timer.set_task_reference(task)?;
    subscribe(&mut timer, &events);

    let mut recorder = SessionRecorder::new(&db);
    let mut out = Output { json };
    let mut commands = spawn_stdin_reader();

    timer.start();
    loop {
        let drained: Vec<_> = events.borrow_mut().drain(..).collect();
        for event in drained {
            out.event(&event, &timer)?;
            if let TimerEvent::StateChanged { state } = event {
                if let Some(record) = recorder.observe(&timer, state)? {
                    out.recorded(&record)?;
                }
            }
        }
        if matches!(timer.state(), TimerState::Completed | TimerState::Abandoned) {
            break;
        }

        let notifications = timer.notifications();
        let input_ready = {
            let mut select = Select::new();
            select.recv(&notifications);
            let input = select.recv(&commands);
            matches!(select.ready_timeout(POLL_INTERVAL), Ok(i) if i == input)
        };
        if input_ready {
            match commands.try_recv() {
                Ok(line) => match Command::parse(&line) {
                    Some(command) => apply(command, &mut timer, &mut recorder),
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown command '{}': use p, r, s, d, f or q", line.trim()),
                },
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("stdin closed; running to completion");
                    commands = crossbeam_channel::never();
                }
                Err(TryRecvError::Empty) => {}
            }
        }
        timer.dispatch_pending();
    }
    Ok(())
}

/// Queue every observer callback so the loop can handle events after the
/// timer call that produced them returns.
fn subscribe(timer: &mut SessionTimer, events: &Rc<RefCell<VecDeque<TimerEvent>>>) {
    let queue = Rc::clone(events);
    timer.on_tick(move |remaining, total| {
        queue
            .borrow_mut()
            .push_back(TimerEvent::Tick { remaining, total });
    });
    let queue = Rc::clone(events);
    timer.on_state_change(move |state| {
        queue
            .borrow_mut()
            .push_back(TimerEvent::StateChanged { state });
    });
    let queue = Rc::clone(events);
    timer.on_complete(move || queue.borrow_mut().push_back(TimerEvent::Completed));
}

fn apply(command: Command, timer: &mut SessionTimer, recorder: &mut SessionRecorder<'_>) {
    let state = timer.state();
    let accepted = match command {
        Command::Pause => timer.pause(),
        Command::Resume => timer.resume(),
        Command::Stop => timer.stop(true),
        Command::Done => timer.stop(false),
        Command::ForceComplete => {
            // The resulting state change is only queued here, so the flag
            // still reaches the recorder before it observes `Completed`.
            let forced = timer.force_complete();
            if forced {
                recorder.mark_force_completed();
            }
            forced
        }
        Command::Quit => {
            if timer.is_running() || timer.is_paused() {
                timer.stop(true)
            } else {
                true
            }
        }
    };
    if !accepted {
        eprintln!("cannot {} while {state}", command.name());
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct Output {
    json: bool,
}

impl Output {
    fn event(&mut self, event: &TimerEvent, timer: &SessionTimer) -> CommandResult {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        match *event {
            TimerEvent::Tick { remaining, total } => {
                let done = progress_percentage(total, remaining);
                write!(stdout, "\r{}  {done:5.1}%", format_clock(remaining))?;
                stdout.flush()?;
            }
            TimerEvent::StateChanged { state } => {
                writeln!(stdout, "\n[{state}] {}", timer.formatted_remaining())?;
            }
            TimerEvent::Completed => writeln!(stdout, "focus session complete")?,
        }
        Ok(())
    }

    fn recorded(&mut self, record: &SessionRecord) -> CommandResult {
        if self.json {
            let value = serde_json::json!({ "type": "session_recorded", "session": record });
            println!("{}", serde_json::to_string(&value)?);
        } else {
            println!("session {} recorded as {}", record.id, record.status);
        }
        Ok(())
    }
}
