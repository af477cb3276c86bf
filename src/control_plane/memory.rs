//! In-process control plane.
//!
//! Keeps a workflow registry, fans every published event out to all
//! subscribers in publish order, and records the commands each workflow's
//! sink receives. Drives the demo mode and the test-suite.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    CommandKind, CommandLogEntry, CommandSink, ControlPlane, ControlPlaneError, ControlPlaneEvent,
    EventPayload, LifecycleKind, ListQuery, ProcessCommand, ProcessEvent, ProcessEventKind,
    ProcessRole, Subscription, Unsubscribe, WorkflowHandle, WorkflowId, WorkflowState,
    WorkflowSummary,
};

struct WorkflowRecord {
    summary: WorkflowSummary,
    archived: bool,
    sink_available: bool,
    pending_failure: Option<ControlPlaneError>,
    next_worker: usize,
}

#[derive(Default)]
struct PlaneState {
    workflows: Vec<WorkflowRecord>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<ControlPlaneEvent>>,
    next_subscriber: u64,
    commands: HashMap<WorkflowId, Vec<ProcessCommand>>,
}

impl PlaneState {
    fn record(&self, id: &WorkflowId) -> Option<&WorkflowRecord> {
        self.workflows.iter().find(|w| &w.summary.id == id)
    }

    fn record_mut(&mut self, id: &WorkflowId) -> Option<&mut WorkflowRecord> {
        self.workflows.iter_mut().find(|w| &w.summary.id == id)
    }

    fn publish(&mut self, event: ControlPlaneEvent) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<PlaneState>,
    watchers: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PlaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Control plane living entirely in memory.
#[derive(Clone, Default)]
pub struct InMemoryControlPlane {
    shared: Arc<Shared>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow and announces it with a `Created` event.
    pub fn add_workflow(&self, summary: WorkflowSummary) {
        let id = summary.id.clone();
        let mut state = self.shared.lock();
        state.workflows.push(WorkflowRecord {
            summary,
            archived: false,
            sink_available: true,
            pending_failure: None,
            next_worker: 1,
        });
        state.publish(ControlPlaneEvent::lifecycle(id.0, LifecycleKind::Created));
    }

    /// Delivers an event to every live subscriber.
    pub fn publish(&self, event: ControlPlaneEvent) {
        self.shared.lock().publish(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// Number of background tasks still watching for subscriber cancellation.
    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.load(Ordering::SeqCst)
    }

    pub fn submitted_commands(&self, id: &WorkflowId) -> Vec<ProcessCommand> {
        self.shared
            .lock()
            .commands
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes `get` return the workflow without a command sink.
    pub fn set_sink_available(&self, id: &WorkflowId, available: bool) {
        if let Some(record) = self.shared.lock().record_mut(id) {
            record.sink_available = available;
        }
    }

    pub fn set_locked(&self, id: &WorkflowId, locked: bool) {
        if let Some(record) = self.shared.lock().record_mut(id) {
            record.summary.locked = locked;
        }
    }

    /// The next lifecycle operation on `id` fails with `err`.
    pub fn inject_failure(&self, id: &WorkflowId, err: ControlPlaneError) {
        if let Some(record) = self.shared.lock().record_mut(id) {
            record.pending_failure = Some(err);
        }
    }

    pub fn update_summary(&self, id: &WorkflowId, f: impl FnOnce(&mut WorkflowSummary)) {
        if let Some(record) = self.shared.lock().record_mut(id) {
            f(&mut record.summary);
        }
    }

    pub fn summary(&self, id: &WorkflowId) -> Option<WorkflowSummary> {
        self.shared.lock().record(id).map(|r| r.summary.clone())
    }

    pub(super) fn transition(
        &self,
        id: &WorkflowId,
        operation: &'static str,
        allowed: &[WorkflowState],
        next: WorkflowState,
        kind: LifecycleKind,
    ) -> Result<(), ControlPlaneError> {
        let mut state = self.shared.lock();
        let record = state
            .record_mut(id)
            .filter(|r| !r.archived)
            .ok_or_else(|| ControlPlaneError::NotFound { id: id.clone() })?;
        if record.summary.locked {
            return Err(ControlPlaneError::Locked { id: id.clone() });
        }
        if let Some(err) = record.pending_failure.take() {
            return Err(err);
        }
        if !allowed.contains(&record.summary.state) {
            return Err(ControlPlaneError::InvalidState {
                id: id.clone(),
                state: record.summary.state,
                operation,
            });
        }
        record.summary.state = next;
        if next == WorkflowState::Running && record.summary.started_at.is_none() {
            record.summary.started_at = Some(Utc::now());
        }
        debug!(workflow = %id, operation, "workflow transitioned");
        state.publish(ControlPlaneEvent::lifecycle(id.0.clone(), kind));
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn subscribe(
        &self,
        cancel: CancellationToken,
    ) -> Result<Subscription, ControlPlaneError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = {
            let mut state = self.shared.lock();
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.insert(id, tx);
            id
        };

        let detach = cancel.child_token();
        let watcher_token = detach.clone();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared.watchers.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            watcher_token.cancelled().await;
            if let Some(shared) = weak.upgrade() {
                shared.lock().subscribers.remove(&subscriber);
                shared.watchers.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Ok(Subscription {
            events: rx,
            unsubscribe: Unsubscribe::new(move || detach.cancel()),
        })
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<WorkflowSummary>, ControlPlaneError> {
        let state = self.shared.lock();
        Ok(state
            .workflows
            .iter()
            .rev()
            .filter(|r| query.include_archived || !r.archived)
            .filter(|r| query.matches(r.summary.state))
            .map(|r| r.summary.clone())
            .collect())
    }

    async fn start(&self, id: &WorkflowId) -> Result<(), ControlPlaneError> {
        self.transition(
            id,
            "start",
            &[WorkflowState::Pending],
            WorkflowState::Running,
            LifecycleKind::Started,
        )
    }

    async fn stop(&self, id: &WorkflowId) -> Result<(), ControlPlaneError> {
        self.transition(
            id,
            "stop",
            &[
                WorkflowState::Pending,
                WorkflowState::Running,
                WorkflowState::Paused,
            ],
            WorkflowState::Completed,
            LifecycleKind::Stopped,
        )
    }

    async fn pause(&self, id: &WorkflowId) -> Result<(), ControlPlaneError> {
        self.transition(
            id,
            "pause",
            &[WorkflowState::Running],
            WorkflowState::Paused,
            LifecycleKind::Paused,
        )
    }

    async fn resume(&self, id: &WorkflowId) -> Result<(), ControlPlaneError> {
        self.transition(
            id,
            "resume",
            &[WorkflowState::Paused],
            WorkflowState::Running,
            LifecycleKind::Resumed,
        )
    }

    async fn archive(&self, id: &WorkflowId) -> Result<(), ControlPlaneError> {
        let mut state = self.shared.lock();
        let record = state
            .record_mut(id)
            .filter(|r| !r.archived)
            .ok_or_else(|| ControlPlaneError::NotFound { id: id.clone() })?;
        if record.summary.locked {
            return Err(ControlPlaneError::Locked { id: id.clone() });
        }
        if let Some(err) = record.pending_failure.take() {
            return Err(err);
        }
        if record.summary.state == WorkflowState::Running {
            return Err(ControlPlaneError::InvalidState {
                id: id.clone(),
                state: record.summary.state,
                operation: "archive",
            });
        }
        record.archived = true;
        state.publish(ControlPlaneEvent::lifecycle(
            id.0.clone(),
            LifecycleKind::Archived,
        ));
        Ok(())
    }

    async fn get(&self, id: &WorkflowId) -> Result<WorkflowHandle, ControlPlaneError> {
        let state = self.shared.lock();
        let record = state
            .record(id)
            .filter(|r| !r.archived)
            .ok_or_else(|| ControlPlaneError::NotFound { id: id.clone() })?;
        let sink: Option<Arc<dyn CommandSink>> = if record.sink_available {
            Some(Arc::new(MemorySink {
                workflow_id: id.clone(),
                shared: Arc::downgrade(&self.shared),
            }))
        } else {
            None
        };
        Ok(WorkflowHandle {
            summary: record.summary.clone(),
            sink,
        })
    }
}

/// Records commands and publishes their observable effects.
struct MemorySink {
    workflow_id: WorkflowId,
    shared: Weak<Shared>,
}

impl CommandSink for MemorySink {
    fn submit(&self, command: ProcessCommand) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut state = shared.lock();
        let wf = self.workflow_id.0.clone();

        let follow_up = match &command.kind {
            CommandKind::SendToProcess {
                process_id,
                content,
            } => {
                let role = if process_id == super::COORDINATOR_ID {
                    ProcessRole::Coordinator
                } else {
                    ProcessRole::Worker
                };
                Some(
                    ProcessEvent::new(ProcessEventKind::Incoming, process_id.clone(), role)
                        .with_message(command.source.as_str(), content.clone()),
                )
            }
            CommandKind::SpawnProcess { .. } => {
                let worker = state.record_mut(&self.workflow_id).map(|r| {
                    let n = r.next_worker;
                    r.next_worker += 1;
                    r.summary.active_workers += 1;
                    format!("worker-{}", n)
                });
                worker.map(|id| ProcessEvent::worker(ProcessEventKind::Spawned, id))
            }
            CommandKind::RetireProcess { process_id, .. } => {
                if let Some(r) = state.record_mut(&self.workflow_id) {
                    r.summary.active_workers = r.summary.active_workers.saturating_sub(1);
                }
                Some(ProcessEvent::worker(
                    ProcessEventKind::Retired,
                    process_id.clone(),
                ))
            }
            CommandKind::StopProcess { .. } | CommandKind::ReplaceProcess { .. } => None,
        };

        state.publish(ControlPlaneEvent::new(
            wf.clone(),
            EventPayload::Command(CommandLogEntry {
                command: command.name().to_string(),
                process_id: command.process_id().map(str::to_string),
                source: command.source.as_str().to_string(),
                success: true,
                error: None,
                timestamp: Utc::now(),
            }),
        ));
        if let Some(event) = follow_up {
            state.publish(ControlPlaneEvent::process(wf, event));
        }
        state
            .commands
            .entry(self.workflow_id.clone())
            .or_default()
            .push(command);
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
