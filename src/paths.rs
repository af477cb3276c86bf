//! Home-based storage paths under `~/.conductor/`:
//! - `config.yaml` - dashboard configuration
//! - `logs/dashboard.log` - tracing output
//!
//! `CONDUCTOR_HOME` overrides the home directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const CONDUCTOR_DIR: &str = ".conductor";
pub const HOME_ENV: &str = "CONDUCTOR_HOME";

/// Returns the conductor home directory, creating it if needed.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or created.
pub fn conductor_home() -> Result<PathBuf> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .context("Could not determine home directory")?
            .join(CONDUCTOR_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create conductor directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(conductor_home()?.join("config.yaml"))
}

/// Returns `logs/dashboard.log`, creating the logs directory.
pub fn log_path() -> Result<PathBuf> {
    let dir = conductor_home()?.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir.join("dashboard.log"))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
