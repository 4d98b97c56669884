pub mod config;
pub mod export;
pub mod log;
pub mod reflect;
pub mod stats;
pub mod task;
pub mod timer;

use serde::Serialize;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
