//! Path Utilities
//!
//! Resolves the Taskmate data directory (~/.taskmate/) and the files in it.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Taskmate directory (~/.taskmate/)
pub fn taskmate_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".taskmate"))
}

/// Get the config file path (~/.taskmate/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(taskmate_dir()?.join("config.json"))
}

/// Get the default database file path (~/.taskmate/taskmate.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(taskmate_dir()?.join("taskmate.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Taskmate directory, creating it if it doesn't exist
pub fn ensure_taskmate_dir() -> AppResult<PathBuf> {
    let path = taskmate_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
