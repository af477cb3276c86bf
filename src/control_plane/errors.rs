//! Error types for control-plane operations.

use std::fmt::{Display, Formatter};

use super::types::{WorkflowId, WorkflowState};

/// Errors returned by control-plane operations (start/stop/list/...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneError {
    /// No workflow with this identity is registered.
    NotFound { id: WorkflowId },
    /// Workflow is owned by another process.
    Locked { id: WorkflowId },
    /// Operation is not valid from the workflow's current state.
    InvalidState {
        id: WorkflowId,
        state: WorkflowState,
        operation: &'static str,
    },
    /// The workflow's worktree has uncommitted changes.
    UncommittedChanges { path: String },
    /// Another worktree already occupies the target path.
    PathConflict { path: String },
    /// The control plane itself is unreachable.
    Unavailable { message: String },
    Other { message: String },
}

impl Display for ControlPlaneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "workflow not found: {}", id),
            Self::Locked { id } => write!(f, "workflow locked: {}", id),
            Self::InvalidState {
                id,
                state,
                operation,
            } => write!(f, "cannot {} workflow {} in state {}", operation, id, state),
            Self::UncommittedChanges { path } => write!(f, "uncommitted changes in {}", path),
            Self::PathConflict { path } => write!(f, "path conflict: {}", path),
            Self::Unavailable { message } => write!(f, "control plane unavailable: {}", message),
            Self::Other { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for ControlPlaneError {}

/// Best-effort human wording for known error categories; raw text otherwise.
pub fn humanize_error(err: &ControlPlaneError) -> String {
    match err {
        ControlPlaneError::UncommittedChanges { path } => format!(
            "Worktree {} has uncommitted changes. Commit or stash them first.",
            path
        ),
        ControlPlaneError::PathConflict { path } => {
            format!("A worktree already exists at {}.", path)
        }
        ControlPlaneError::Locked { .. } => "Workflow is locked by another process.".to_string(),
        ControlPlaneError::NotFound { id } => format!("Workflow {} no longer exists.", id),
        ControlPlaneError::InvalidState {
            state, operation, ..
        } => format!("Cannot {} a {} workflow.", operation, state),
        other => other.to_string(),
    }
}
