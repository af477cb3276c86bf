use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| anyhow::anyhow!("Invalid log level '{}'", level))
}

/// Installs the global subscriber, appending plain text to `log_path`.
/// The terminal belongs to the dashboard, so nothing goes to stdout.
pub fn init_logging(log_path: &Path, level: &str) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level)?)
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("A global tracing subscriber is already installed")?;
    Ok(())
}
