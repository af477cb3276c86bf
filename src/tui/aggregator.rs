//! Folds control-plane events into the session store.

use std::sync::Arc;
use tracing::{debug, trace};

use super::session::{append_output, ChatMessage, MessageRole, WorkflowSession};
use super::session_store::{Clock, SessionStore};
use crate::control_plane::{
    ControlPlaneEvent, EventPayload, ProcessEvent, ProcessEventKind, ProcessStatus,
};

/// What applying one event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Empty workflow identity; nothing was created or touched.
    Rejected,
    /// The event carried nothing worth keeping (empty output, zero usage,
    /// control-only fabric traffic, non-terminal lifecycle).
    Unchanged,
    Updated,
    /// A terminal lifecycle event dropped the session.
    Removed,
}

pub struct EventAggregator {
    clock: Option<Arc<dyn Clock>>,
}

impl EventAggregator {
    pub fn new(clock: Option<Arc<dyn Clock>>) -> Self {
        Self { clock }
    }

    /// Applies one event. Mutates sessions only, never the workflow list.
    pub fn apply(&self, store: &mut SessionStore, event: &ControlPlaneEvent) -> ApplyOutcome {
        if event.workflow_id.is_empty() {
            debug!("rejecting event without workflow id");
            return ApplyOutcome::Rejected;
        }
        let id = &event.workflow_id;

        let outcome = match &event.payload {
            EventPayload::Lifecycle { kind } => {
                if kind.is_terminal() {
                    store.remove(id);
                    return ApplyOutcome::Removed;
                }
                return ApplyOutcome::Unchanged;
            }
            EventPayload::Process(process) => {
                if Self::carries_nothing(process) {
                    trace!(workflow = %id, kind = ?process.kind, "discarding empty process event");
                    return ApplyOutcome::Unchanged;
                }
                if process.kind == ProcessEventKind::Retired && !store.contains(id) {
                    return ApplyOutcome::Unchanged;
                }
                let session = store.get_or_create(id);
                Self::apply_process(session, process, event.timestamp)
            }
            EventPayload::Fabric(fabric) => {
                // Control-only traffic must not create or refresh a session.
                if !fabric.kind.is_user_visible() {
                    return ApplyOutcome::Unchanged;
                }
                store.get_or_create(id).fabric_log.push(fabric.clone());
                ApplyOutcome::Updated
            }
            EventPayload::Command(entry) => {
                store.get_or_create(id).command_log.push(entry.clone());
                ApplyOutcome::Updated
            }
            EventPayload::Notification { message } => {
                debug!(workflow = %id, %message, "notification");
                store.get_or_create(id).has_notification = true;
                ApplyOutcome::Updated
            }
        };

        if outcome == ApplyOutcome::Updated {
            if let (Some(clock), Some(session)) = (&self.clock, store.get_mut(id)) {
                session.touch(clock.now());
            }
        }
        trace!(workflow = %id, ?outcome, "event applied");
        outcome
    }

    /// Events that would leave any session untouched.
    fn carries_nothing(event: &ProcessEvent) -> bool {
        match event.kind {
            ProcessEventKind::Output => event.output.is_empty(),
            ProcessEventKind::TokenUsage => !event.metrics.is_some_and(|m| m.has_usage()),
            ProcessEventKind::Incoming => !event.message.as_deref().is_some_and(|m| !m.is_empty()),
            ProcessEventKind::Retired => event.is_coordinator(),
            _ => false,
        }
    }

    fn apply_process(
        session: &mut WorkflowSession,
        event: &ProcessEvent,
        at: chrono::DateTime<chrono::Utc>,
    ) -> ApplyOutcome {
        let coordinator = event.is_coordinator();
        let changed = match event.kind {
            ProcessEventKind::Output => {
                if coordinator {
                    append_output(
                        &mut session.coordinator_transcript,
                        MessageRole::Coordinator,
                        &event.output,
                        event.delta,
                        at,
                    )
                } else if event.output.is_empty() {
                    false
                } else {
                    let worker = session.worker_mut(&event.process_id);
                    append_output(
                        &mut worker.transcript,
                        MessageRole::Worker,
                        &event.output,
                        event.delta,
                        at,
                    )
                }
            }
            ProcessEventKind::Ready | ProcessEventKind::Working => {
                let status = event.status.unwrap_or(if event.kind == ProcessEventKind::Ready {
                    ProcessStatus::Ready
                } else {
                    ProcessStatus::Working
                });
                if coordinator {
                    session.coordinator_status = status;
                    true
                } else {
                    let worker = session.worker_mut(&event.process_id);
                    // Retirement is final; late status reports are stale.
                    if worker.is_retired() {
                        false
                    } else {
                        worker.status = status;
                        if event.phase.is_some() {
                            worker.phase = event.phase.clone();
                        }
                        true
                    }
                }
            }
            ProcessEventKind::TokenUsage => match event.metrics {
                Some(metrics) if metrics.has_usage() => {
                    if coordinator {
                        session.coordinator_metrics = Some(metrics);
                    } else {
                        session.worker_mut(&event.process_id).metrics = Some(metrics);
                    }
                    true
                }
                _ => false,
            },
            ProcessEventKind::QueueChanged => {
                if coordinator {
                    session.coordinator_queue_depth = event.queue_depth;
                } else {
                    session.worker_mut(&event.process_id).queue_depth = event.queue_depth;
                }
                true
            }
            ProcessEventKind::Spawned => {
                if coordinator {
                    session.coordinator_status = ProcessStatus::Ready;
                    true
                } else if session.add_worker(&event.process_id) {
                    if let Some(worker) = session.workers.get_mut(&event.process_id) {
                        worker.phase = event.phase.clone();
                    }
                    true
                } else {
                    false
                }
            }
            ProcessEventKind::Retired => {
                !coordinator && session.retire_worker(&event.process_id)
            }
            ProcessEventKind::Incoming => {
                let Some(message) = event.message.as_deref().filter(|m| !m.is_empty()) else {
                    return ApplyOutcome::Unchanged;
                };
                let sender = event.sender.as_deref().unwrap_or("system");
                let entry = if sender == "user" {
                    ChatMessage::new(MessageRole::User, message, at)
                } else {
                    ChatMessage::new(MessageRole::System, format!("[{}] {}", sender, message), at)
                };
                if coordinator {
                    session.coordinator_transcript.push(entry);
                } else {
                    session.worker_mut(&event.process_id).transcript.push(entry);
                }
                true
            }
            ProcessEventKind::Error => {
                let text = if event.output.is_empty() {
                    "process reported an error".to_string()
                } else {
                    event.output.clone()
                };
                let entry = ChatMessage::new(MessageRole::System, text, at);
                if coordinator {
                    session.coordinator_status = ProcessStatus::Failed;
                    session.coordinator_transcript.push(entry);
                } else {
                    let worker = session.worker_mut(&event.process_id);
                    if !worker.is_retired() {
                        worker.status = ProcessStatus::Failed;
                    }
                    worker.transcript.push(entry);
                }
                true
            }
        };

        if changed {
            ApplyOutcome::Updated
        } else {
            ApplyOutcome::Unchanged
        }
    }
}

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
mod tests;
