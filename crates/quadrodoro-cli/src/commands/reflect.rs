use chrono::{Local, NaiveDate};
use clap::Subcommand;
use quadrodoro_core::{Database, LogManager};

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum ReflectAction {
    /// Write or replace the reflection for a day
    Set {
        /// Reflection text
        content: String,
        /// Day (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the reflection for a day
    Get {
        /// Day (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// All reflections, newest first
    List,
}

pub fn run(action: ReflectAction) -> CommandResult {
    let db = Database::open()?;
    let log = LogManager::new(&db);
    let today = || Local::now().date_naive();

    match action {
        ReflectAction::Set { content, date } => {
            print_json(&log.reflect(date.unwrap_or_else(today), &content)?)?;
        }
        ReflectAction::Get { date } => {
            print_json(&log.reflection(date.unwrap_or_else(today))?)?;
        }
        ReflectAction::List => {
            print_json(&log.reflections()?)?;
        }
    }
    Ok(())
}
