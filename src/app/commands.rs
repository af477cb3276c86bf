//! Command gateway: turns text typed in the interaction panel into exactly
//! one typed command and hands it to the workflow's command sink.

use std::sync::Arc;
use tracing::{debug, info};

use crate::control_plane::{
    CommandKind, ControlPlane, ProcessCommand, ProcessRole, WorkflowId, COORDINATOR_ID,
    USER_REQUESTED,
};

pub const STOP_USAGE: &str = "usage: /stop <id> [--force]";
pub const RETIRE_USAGE: &str = "usage: /retire <id> [reason...]";
pub const REPLACE_USAGE: &str = "usage: /replace <id> [reason...]";
pub const RETIRE_COORDINATOR: &str = "the coordinator cannot be retired; use /replace instead";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Command(ProcessCommand),
    /// Malformed command. Shown as a toast, nothing is sent.
    Warning(String),
    /// Blank input.
    Empty,
}

/// Parses `raw`. Text that does not start with a recognised command token
/// is sent verbatim to `target`.
pub fn parse_input(raw: &str, target: &str) -> ParsedInput {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedInput::Empty;
    }

    let mut parts = trimmed.split_whitespace();
    let token = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let parsed = match token {
        "/stop" => Some(parse_stop(&args)),
        "/spawn" => Some(ParsedInput::Command(ProcessCommand::user(
            CommandKind::SpawnProcess {
                role: ProcessRole::Worker,
            },
        ))),
        "/retire" => Some(parse_retire(&args)),
        "/replace" => Some(parse_replace(&args)),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        ParsedInput::Command(ProcessCommand::user(CommandKind::SendToProcess {
            process_id: target.to_string(),
            content: raw.to_string(),
        }))
    })
}

fn parse_stop(args: &[&str]) -> ParsedInput {
    let force = args.iter().any(|a| *a == "--force");
    let Some(id) = args.iter().find(|a| !a.starts_with("--")) else {
        return ParsedInput::Warning(STOP_USAGE.to_string());
    };
    ParsedInput::Command(ProcessCommand::user(CommandKind::StopProcess {
        process_id: id.to_string(),
        force,
        reason: USER_REQUESTED.to_string(),
    }))
}

fn parse_retire(args: &[&str]) -> ParsedInput {
    let Some((id, rest)) = args.split_first() else {
        return ParsedInput::Warning(RETIRE_USAGE.to_string());
    };
    if *id == COORDINATOR_ID {
        return ParsedInput::Warning(RETIRE_COORDINATOR.to_string());
    }
    ParsedInput::Command(ProcessCommand::user(CommandKind::RetireProcess {
        process_id: id.to_string(),
        reason: reason_from(rest),
    }))
}

fn parse_replace(args: &[&str]) -> ParsedInput {
    let Some((id, rest)) = args.split_first() else {
        return ParsedInput::Warning(REPLACE_USAGE.to_string());
    };
    ParsedInput::Command(ProcessCommand::user(CommandKind::ReplaceProcess {
        process_id: id.to_string(),
        reason: reason_from(rest),
    }))
}

fn reason_from(words: &[&str]) -> String {
    if words.is_empty() {
        USER_REQUESTED.to_string()
    } else {
        words.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// Workflow or its sink is gone. Treated as handled.
    Dropped,
}

/// Resolves a workflow's command sink and submits commands to it.
#[derive(Clone)]
pub struct CommandGateway {
    plane: Arc<dyn ControlPlane>,
}

impl CommandGateway {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self { plane }
    }

    pub async fn dispatch(&self, workflow_id: &WorkflowId, command: ProcessCommand) -> DispatchOutcome {
        let handle = match self.plane.get(workflow_id).await {
            Ok(handle) => handle,
            Err(err) => {
                debug!(workflow = %workflow_id, command = %command, error = %err, "dropping command");
                return DispatchOutcome::Dropped;
            }
        };
        let Some(sink) = handle.sink else {
            debug!(workflow = %workflow_id, command = %command, "no command sink, dropping command");
            return DispatchOutcome::Dropped;
        };
        info!(workflow = %workflow_id, command = %command, "submitting command");
        sink.submit(command);
        DispatchOutcome::Delivered
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
