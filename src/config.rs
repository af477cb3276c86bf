use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `toast_ttl_secs`.
pub const MAX_TOAST_TTL_SECS: u64 = 3600;

/// Dashboard settings read from `config.yaml`. Every field is optional in
/// the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Soft cap on cached sessions. Protected sessions may exceed it.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_fabric_log_cap")]
    pub fabric_log_cap: usize,

    #[serde(default = "default_command_log_cap")]
    pub command_log_cap: usize,

    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,

    #[serde(default = "default_toast_ttl_secs")]
    pub toast_ttl_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Workflows seeded by the demo control plane.
    #[serde(default = "default_demo_workflows")]
    pub demo_workflows: usize,
}

fn default_max_sessions() -> usize {
    10
}

fn default_fabric_log_cap() -> usize {
    500
}

fn default_command_log_cap() -> usize {
    2000
}

fn default_tick_rate_ms() -> u64 {
    250
}

fn default_toast_ttl_secs() -> u64 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_demo_workflows() -> usize {
    6
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            fabric_log_cap: default_fabric_log_cap(),
            command_log_cap: default_command_log_cap(),
            tick_rate_ms: default_tick_rate_ms(),
            toast_ttl_secs: default_toast_ttl_secs(),
            log_level: default_log_level(),
            demo_workflows: default_demo_workflows(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validated()
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Clamps capacities to at least 1, bounds the toast TTL and rejects
    /// unknown log levels.
    pub fn validated(mut self) -> Result<Self> {
        self.max_sessions = self.max_sessions.max(1);
        self.fabric_log_cap = self.fabric_log_cap.max(1);
        self.command_log_cap = self.command_log_cap.max(1);
        self.tick_rate_ms = self.tick_rate_ms.max(10);
        self.toast_ttl_secs = self.toast_ttl_secs.clamp(1, MAX_TOAST_TTL_SECS);
        self.log_level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level '{}': expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        Ok(self)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_ttl_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
