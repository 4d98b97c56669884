use chrono::{Local, NaiveDate};
use clap::Subcommand;
use quadrodoro_core::{Config, Database, LogManager, TaskManager};

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum LogAction {
    /// Append an entry to the work log
    Add {
        /// Entry text
        content: String,
        /// Attach the entry to a task
        #[arg(long)]
        task: Option<i64>,
    },
    /// Entries for one day
    List {
        /// Day to show (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Entries attached to a task
    Task {
        /// Task ID
        id: i64,
    },
    /// Most recent entries
    Recent {
        /// Number of entries (default: log.recent_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Entries containing a word or phrase
    Search {
        /// Text to look for
        query: String,
        /// Only search entries from this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: LogAction) -> CommandResult {
    let db = Database::open()?;
    let log = LogManager::new(&db);

    match action {
        LogAction::Add { content, task } => {
            if let Some(id) = task {
                TaskManager::new(&db).require(id)?;
            }
            print_json(&log.add(&content, task)?)?;
        }
        LogAction::List { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            print_json(&log.on(date)?)?;
        }
        LogAction::Task { id } => {
            print_json(&log.for_task(id)?)?;
        }
        LogAction::Recent { limit } => {
            let limit = match limit {
                Some(n) => n,
                None => Config::load()?.log.recent_limit,
            };
            print_json(&log.recent(limit)?)?;
        }
        LogAction::Search { query, date } => {
            print_json(&log.search(&query, date)?)?;
        }
    }
    Ok(())
}
