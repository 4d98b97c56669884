//! Persistence: the SQLite repository and the TOML configuration.

mod config;
pub mod database;
mod journal;
pub mod migrations;
mod sessions;

pub use config::{
    Config, LogConfig, TimerConfig, DURATION_ENV, TEST_MODE_DURATION_SECS, TEST_MODE_ENV,
};
pub use database::{Database, DATABASE_FILE};
pub use journal::{Export, LogEntry, Reflection};
pub use sessions::{SessionRecord, SessionStatus, UnknownStatus};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding the database and `config.toml`.
///
/// `QUADRODORO_DATA_DIR` wins when set. Otherwise `~/.config/quadrodoro`,
/// or `~/.config/quadrodoro-dev` when `QUADRODORO_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("QUADRODORO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("QUADRODORO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("quadrodoro-dev")
            } else {
                base_dir.join("quadrodoro")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
