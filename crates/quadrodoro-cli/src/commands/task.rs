//! Task management commands for CLI.

use clap::Subcommand;
use quadrodoro_core::{Database, TaskManager};
use serde_json::json;

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task description
        description: String,
        /// Quadrant: 0 urgent & important, 1 important, 2 urgent, 3 neither
        #[arg(long, short, default_value = "0", allow_negative_numbers = true)]
        quadrant: i64,
        /// Estimated pomodoros
        #[arg(long, short, default_value = "1", allow_negative_numbers = true)]
        estimate: i64,
    },
    /// List tasks
    List {
        /// Only tasks in this quadrant
        #[arg(long, short, allow_negative_numbers = true)]
        quadrant: Option<i64>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
        /// Only completed tasks
        #[arg(long, conflicts_with = "all")]
        completed: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: i64,
    },
    /// Update an open task
    Update {
        /// Task ID
        id: i64,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New estimated pomodoros
        #[arg(long, allow_negative_numbers = true)]
        estimate: Option<i64>,
    },
    /// Move an open task to another quadrant
    Move {
        /// Task ID
        id: i64,
        /// Target quadrant (0-3)
        #[arg(allow_negative_numbers = true)]
        quadrant: i64,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: i64,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
    /// Pending and completed counts per quadrant
    Summary,
}

pub fn run(action: TaskAction) -> CommandResult {
    let db = Database::open()?;
    let tasks = TaskManager::new(&db);

    match action {
        TaskAction::Create {
            description,
            quadrant,
            estimate,
        } => {
            let task = tasks.create_task(&description, quadrant, estimate)?;
            print_json(&task)?;
        }
        TaskAction::List {
            quadrant,
            all,
            completed,
        } => {
            let list = if completed {
                let mut done = tasks.completed_tasks()?;
                if let Some(q) = quadrant {
                    done.retain(|t| t.quadrant.index() == q);
                }
                done
            } else {
                match quadrant {
                    Some(q) => tasks.tasks_in_quadrant(q, all)?,
                    None => tasks.list_tasks(all)?,
                }
            };
            print_json(&list)?;
        }
        TaskAction::Get { id } => {
            let task = tasks.require(id)?;
            let value = json!({
                "task": task,
                "quadrant_name": task.quadrant.name(),
                "duration_days": task.duration_days(),
            });
            print_json(&value)?;
        }
        TaskAction::Update {
            id,
            description,
            estimate,
        } => {
            let updated = tasks.update_task(id, description.as_deref(), estimate)?;
            if !updated {
                eprintln!("nothing to update: pass --description or --estimate");
            }
            print_json(&json!({ "id": id, "updated": updated }))?;
        }
        TaskAction::Move { id, quadrant } => {
            let moved = tasks.move_task(id, quadrant)?;
            print_json(&json!({ "id": id, "moved": moved }))?;
        }
        TaskAction::Complete { id } => {
            let completed = tasks.complete_task(id)?;
            print_json(&json!({ "id": id, "completed": completed }))?;
        }
        TaskAction::Delete { id } => {
            tasks.delete_task(id)?;
            print_json(&json!({ "id": id, "deleted": true }))?;
        }
        TaskAction::Summary => {
            print_json(&tasks.quadrant_summary()?)?;
        }
    }
    Ok(())
}
