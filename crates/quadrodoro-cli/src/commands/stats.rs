use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::Subcommand;
use quadrodoro_core::{Database, Statistics};
use serde_json::json;

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// One day's pomodoros, completed tasks, pending quadrants and logs
    Day {
        /// Day (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Pomodoros for seven consecutive days
    Week {
        /// First day (YYYY-MM-DD, default: six days ago)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Per-day counts for a month
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Current and longest productivity streak
    Streak,
    /// Task completion per quadrant
    Quadrants,
    /// Monday-first calendar grid for a month
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Pomodoros and sessions for one task
    Task {
        /// Task ID
        id: i64,
    },
    /// Total pomodoros, optionally within a date range
    Total {
        /// First day, inclusive
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, inclusive
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> CommandResult {
    let db = Database::open()?;
    let stats = Statistics::new(&db);
    let today = Local::now().date_naive();

    match action {
        StatsAction::Day { date } => {
            print_json(&stats.daily(date.unwrap_or(today))?)?;
        }
        StatsAction::Week { start } => {
            let start = start.unwrap_or(today - Duration::days(6));
            print_json(&stats.weekly(start)?)?;
        }
        StatsAction::Month { year, month } => {
            let monthly = stats.monthly(
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
            )?;
            let value = json!({
                "stats": monthly,
                "average_per_active_day": monthly.average_per_active_day(),
            });
            print_json(&value)?;
        }
        StatsAction::Streak => {
            print_json(&stats.streak()?)?;
        }
        StatsAction::Quadrants => {
            print_json(&stats.quadrant_distribution()?)?;
        }
        StatsAction::Calendar { year, month } => {
            let grid = stats.calendar(
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
            )?;
            print_json(&grid)?;
        }
        StatsAction::Task { id } => {
            print_json(&stats.task(id)?)?;
        }
        StatsAction::Total { from, to } => {
            let total = stats.total(from, to)?;
            print_json(&json!({ "from": from, "to": to, "total_pomodoros": total }))?;
        }
    }
    Ok(())
}
