use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};

use crate::control_plane::{
    CommandLogEntry, FabricEvent, ProcessStatus, TokenMetrics, WorkflowId, COORDINATOR_ID,
};

/// Content prefix that marks a transcript entry as a tool invocation.
pub const TOOL_CALL_PREFIX: &str = "🔧";

pub fn is_tool_call(content: &str) -> bool {
    content.starts_with(TOOL_CALL_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    Coordinator,
    Worker,
    User,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub is_tool_call: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let content = content.into();
        Self {
            role,
            is_tool_call: is_tool_call(&content),
            content,
            timestamp,
        }
    }
}

/// Appends output to a transcript, coalescing streaming deltas into the
/// previous entry when it has the same role and is not a tool call.
/// Returns false when the text is empty and nothing changed.
pub fn append_output(
    transcript: &mut Vec<ChatMessage>,
    role: MessageRole,
    text: &str,
    delta: bool,
    timestamp: DateTime<Utc>,
) -> bool {
    if text.is_empty() {
        return false;
    }
    if delta {
        if let Some(last) = transcript.last_mut() {
            if last.role == role && !last.is_tool_call {
                last.content.push_str(text);
                return true;
            }
        }
    }
    transcript.push(ChatMessage::new(role, text, timestamp));
    true
}

/// FIFO log that silently drops its oldest entries past `cap`.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.entries.back()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerState {
    pub id: String,
    pub transcript: Vec<ChatMessage>,
    pub status: ProcessStatus,
    pub phase: Option<String>,
    pub queue_depth: usize,
    pub metrics: Option<TokenMetrics>,
}

impl WorkerState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: Vec::new(),
            status: ProcessStatus::Ready,
            phase: None,
            queue_depth: 0,
            metrics: None,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.status == ProcessStatus::Retired
    }
}

/// Per-zone view positions remembered while a workflow is not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionViewState {
    pub tree_cursor: usize,
    pub details_scroll: usize,
    pub transcript_scroll: usize,
    pub follow: bool,
}

/// Cached UI-facing state of one workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    pub workflow_id: WorkflowId,
    pub coordinator_transcript: Vec<ChatMessage>,
    pub coordinator_status: ProcessStatus,
    pub coordinator_queue_depth: usize,
    pub coordinator_metrics: Option<TokenMetrics>,
    /// Active worker identities in spawn order. Never holds duplicates.
    pub worker_ids: Vec<String>,
    /// Every worker seen, retired ones included.
    pub workers: BTreeMap<String, WorkerState>,
    pub fabric_log: BoundedLog<FabricEvent>,
    pub command_log: BoundedLog<CommandLogEntry>,
    pub has_notification: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub view: SessionViewState,
}

impl WorkflowSession {
    pub fn new(workflow_id: WorkflowId, fabric_cap: usize, command_cap: usize) -> Self {
        Self {
            workflow_id,
            coordinator_transcript: Vec::new(),
            coordinator_status: ProcessStatus::Pending,
            coordinator_queue_depth: 0,
            coordinator_metrics: None,
            worker_ids: Vec::new(),
            workers: BTreeMap::new(),
            fabric_log: BoundedLog::new(fabric_cap),
            command_log: BoundedLog::new(command_cap),
            has_notification: false,
            last_updated: None,
            view: SessionViewState {
                follow: true,
                ..SessionViewState::default()
            },
        }
    }

    /// Refreshes `last_updated`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(match self.last_updated {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    /// Adds a worker to the active list. Returns false if it was already known.
    pub fn add_worker(&mut self, id: &str) -> bool {
        if self.workers.contains_key(id) {
            return false;
        }
        self.workers.insert(id.to_string(), WorkerState::new(id));
        self.worker_ids.push(id.to_string());
        true
    }

    /// Returns the worker's state, registering it as active if unseen.
    pub fn worker_mut(&mut self, id: &str) -> &mut WorkerState {
        if !self.workers.contains_key(id) {
            self.worker_ids.push(id.to_string());
        }
        self.workers
            .entry(id.to_string())
            .or_insert_with(|| WorkerState::new(id))
    }

    /// Marks the worker retired and drops it from the active list. History stays.
    pub fn retire_worker(&mut self, id: &str) -> bool {
        let Some(worker) = self.workers.get_mut(id) else {
            return false;
        };
        worker.status = ProcessStatus::Retired;
        self.worker_ids.retain(|w| w != id);
        true
    }

    /// Nodes of the process tree: coordinator first, then every known worker.
    pub fn tree_nodes(&self) -> Vec<&str> {
        std::iter::once(COORDINATOR_ID)
            .chain(self.workers.keys().map(String::as_str))
            .collect()
    }

    pub fn transcript_for(&self, process_id: &str) -> &[ChatMessage] {
        if process_id == COORDINATOR_ID {
            &self.coordinator_transcript
        } else {
            self.workers
                .get(process_id)
                .map(|w| w.transcript.as_slice())
                .unwrap_or(&[])
        }
    }

    /// Rows of the details pane for `process_id`: its transcript followed by
    /// the workflow's fabric and command logs.
    pub fn detail_rows(&self, process_id: &str) -> usize {
        self.transcript_for(process_id).len() + self.fabric_log.len() + self.command_log.len()
    }

    pub fn total_tokens(&self) -> u64 {
        let coordinator = self.coordinator_metrics.map_or(0, |m| m.total_tokens());
        coordinator
            + self
                .workers
                .values()
                .filter_map(|w| w.metrics)
                .map(|m| m.total_tokens())
                .sum::<u64>()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
