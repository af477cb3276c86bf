//! Typed lifecycle commands submitted to a workflow's command processor.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::ProcessRole;

/// Default reason attached to user-issued stop/retire/replace commands.
pub const USER_REQUESTED: &str = "user_requested";

/// Distinguishes user-issued commands from system-issued ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    User,
    System,
}

impl CommandSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSource::User => "user",
            CommandSource::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    StopProcess {
        process_id: String,
        force: bool,
        reason: String,
    },
    SpawnProcess {
        role: ProcessRole,
    },
    RetireProcess {
        process_id: String,
        reason: String,
    },
    ReplaceProcess {
        process_id: String,
        reason: String,
    },
    SendToProcess {
        process_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCommand {
    pub kind: CommandKind,
    pub source: CommandSource,
}

impl ProcessCommand {
    pub fn user(kind: CommandKind) -> Self {
        Self {
            kind,
            source: CommandSource::User,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            CommandKind::StopProcess { .. } => "stop_process",
            CommandKind::SpawnProcess { .. } => "spawn_process",
            CommandKind::RetireProcess { .. } => "retire_process",
            CommandKind::ReplaceProcess { .. } => "replace_process",
            CommandKind::SendToProcess { .. } => "send_to_process",
        }
    }

    /// The process this command targets, if any.
    pub fn process_id(&self) -> Option<&str> {
        match &self.kind {
            CommandKind::StopProcess { process_id, .. }
            | CommandKind::RetireProcess { process_id, .. }
            | CommandKind::ReplaceProcess { process_id, .. }
            | CommandKind::SendToProcess { process_id, .. } => Some(process_id),
            CommandKind::SpawnProcess { .. } => None,
        }
    }
}

impl fmt::Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.process_id() {
            Some(id) => write!(f, "{}({})", self.name(), id),
            None => f.write_str(self.name()),
        }
    }
}
