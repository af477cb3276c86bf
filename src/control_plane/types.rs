//! Data shapes exchanged with the control plane.
//!
//! The dashboard only consumes these: list snapshots arrive as
//! [`WorkflowSummary`] values and the event stream delivers
//! [`ControlPlaneEvent`] envelopes, one per scheduler turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity of the coordinator process inside every workflow.
pub const COORDINATOR_ID: &str = "coordinator";

/// Stable identity of a workflow. Authoritative for selection and caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkflowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a workflow as reported by list snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Pending => "pending",
            WorkflowState::Running => "running",
            WorkflowState::Paused => "paused",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the workflow list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    pub state: WorkflowState,
    /// Owned by another dashboard process; lifecycle actions are refused.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub active_workers: usize,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub epic: Option<String>,
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl WorkflowSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: WorkflowState) -> Self {
        Self {
            id: WorkflowId::new(id),
            name: name.into(),
            state,
            locked: false,
            active_workers: 0,
            tokens_used: 0,
            started_at: None,
            epic: None,
            work_dir: None,
        }
    }

    /// Name used for display and for filter matching. Falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Parameters of a list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub include_archived: bool,
    /// Empty means all states.
    pub states: Vec<WorkflowState>,
}

impl ListQuery {
    pub fn matches(&self, state: WorkflowState) -> bool {
        self.states.is_empty() || self.states.contains(&state)
    }
}

/// Which kind of agent process produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    #[default]
    Coordinator,
    Worker,
}

/// Runtime status of a coordinator or worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Pending,
    Ready,
    Working,
    Stopped,
    Retired,
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "pending",
            ProcessStatus::Ready => "ready",
            ProcessStatus::Working => "working",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Retired => "retired",
            ProcessStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage snapshot for one process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cost_usd: f64,
}

impl TokenMetrics {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            + self.output_tokens
            + self.cache_read_tokens
            + self.cache_creation_tokens
    }

    /// Cost-only updates report no token usage.
    pub fn has_usage(&self) -> bool {
        self.total_tokens() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEventKind {
    Spawned,
    Output,
    Ready,
    Working,
    TokenUsage,
    QueueChanged,
    Retired,
    /// A message was delivered to the process.
    Incoming,
    Error,
}

/// Payload of a coordinator or worker event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub kind: ProcessEventKind,
    pub process_id: String,
    pub role: ProcessRole,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub delta: bool,
    #[serde(default)]
    pub status: Option<ProcessStatus>,
    #[serde(default)]
    pub queue_depth: usize,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub metrics: Option<TokenMetrics>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProcessEvent {
    pub fn new(kind: ProcessEventKind, process_id: impl Into<String>, role: ProcessRole) -> Self {
        Self {
            kind,
            process_id: process_id.into(),
            role,
            output: String::new(),
            delta: false,
            status: None,
            queue_depth: 0,
            phase: None,
            metrics: None,
            sender: None,
            message: None,
        }
    }

    pub fn coordinator(kind: ProcessEventKind) -> Self {
        Self::new(kind, COORDINATOR_ID, ProcessRole::Coordinator)
    }

    pub fn worker(kind: ProcessEventKind, worker_id: impl Into<String>) -> Self {
        Self::new(kind, worker_id, ProcessRole::Worker)
    }

    pub fn with_output(mut self, output: impl Into<String>, delta: bool) -> Self {
        self.output = output.into();
        self.delta = delta;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_metrics(mut self, metrics: TokenMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_message(mut self, sender: impl Into<String>, message: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self.message = Some(message.into());
        self
    }

    /// Whether the event belongs to the coordinator rather than a worker.
    pub fn is_coordinator(&self) -> bool {
        self.role == ProcessRole::Coordinator || self.process_id == COORDINATOR_ID
    }
}

/// Sub-types of inter-process messaging ("fabric") events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FabricEventKind {
    ChannelCreated,
    MessagePosted,
    ReplyPosted,
    Reacted,
    Subscribed,
    Unsubscribed,
    Acked,
    Heartbeat,
}

impl FabricEventKind {
    /// Only user-visible content is retained in the session log.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            FabricEventKind::ChannelCreated
                | FabricEventKind::MessagePosted
                | FabricEventKind::ReplyPosted
                | FabricEventKind::Reacted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricEvent {
    pub kind: FabricEventKind,
    pub channel: String,
    pub sender: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Record of a command processed by a workflow's command processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub command: String,
    #[serde(default)]
    pub process_id: Option<String>,
    pub source: String,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Workflow-level lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    Created,
    Started,
    Paused,
    Resumed,
    Stopped,
    Failed,
    Archived,
}

impl LifecycleKind {
    /// Terminal transitions reclaim the cached session immediately.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleKind::Stopped | LifecycleKind::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Lifecycle { kind: LifecycleKind },
    Process(ProcessEvent),
    Fabric(FabricEvent),
    Command(CommandLogEntry),
    Notification { message: String },
}

/// Envelope delivered on the subscription channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneEvent {
    pub workflow_id: WorkflowId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl ControlPlaneEvent {
    pub fn new(workflow_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            workflow_id: WorkflowId::new(workflow_id),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn process(workflow_id: impl Into<String>, event: ProcessEvent) -> Self {
        Self::new(workflow_id, EventPayload::Process(event))
    }

    pub fn lifecycle(workflow_id: impl Into<String>, kind: LifecycleKind) -> Self {
        Self::new(workflow_id, EventPayload::Lifecycle { kind })
    }

    /// Lifecycle-class events require a full list reload.
    pub fn requires_reload(&self) -> bool {
        matches!(self.payload, EventPayload::Lifecycle { .. })
    }
}
