//! Control-plane seam consumed by the dashboard.
//!
//! The dashboard never executes agent processes itself. It subscribes to a
//! single ordered event channel, queries list snapshots, asks for lifecycle
//! transitions, and hands typed commands to a per-workflow [`CommandSink`].

pub mod commands;
pub mod errors;
pub mod memory;
pub mod simulator;
pub mod types;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use commands::{CommandKind, CommandSource, ProcessCommand, USER_REQUESTED};
pub use errors::{humanize_error, ControlPlaneError};
pub use memory::InMemoryControlPlane;
pub use types::{
    CommandLogEntry, ControlPlaneEvent, EventPayload, FabricEvent, FabricEventKind,
    LifecycleKind, ListQuery, ProcessEvent, ProcessEventKind, ProcessRole, ProcessStatus,
    TokenMetrics, WorkflowId, WorkflowState, WorkflowSummary, COORDINATOR_ID,
};

/// Fire-and-forget command processor of one workflow.
pub trait CommandSink: Send + Sync {
    fn submit(&self, command: ProcessCommand);
}

/// A resolved workflow together with its command sink, when its
/// infrastructure is up.
#[derive(Clone)]
pub struct WorkflowHandle {
    pub summary: WorkflowSummary,
    pub sink: Option<Arc<dyn CommandSink>>,
}

impl fmt::Debug for WorkflowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowHandle")
            .field("summary", &self.summary)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Detaches a subscriber from the control plane.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn call(self) {
        (self.0)()
    }
}

/// The single ordered event channel for all workflows.
pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<ControlPlaneEvent>,
    pub unsubscribe: Unsubscribe,
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Subscribe to events of every workflow. Cancelling `cancel` detaches
    /// the subscriber as well.
    async fn subscribe(&self, cancel: CancellationToken)
        -> Result<Subscription, ControlPlaneError>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<WorkflowSummary>, ControlPlaneError>;

    async fn start(&self, id: &WorkflowId) -> Result<(), ControlPlaneError>;

    async fn stop(&self, id: &WorkflowId) -> Result<(), ControlPlaneError>;

    async fn pause(&self, id: &WorkflowId) -> Result<(), ControlPlaneError>;

    async fn resume(&self, id: &WorkflowId) -> Result<(), ControlPlaneError>;

    async fn archive(&self, id: &WorkflowId) -> Result<(), ControlPlaneError>;

    async fn get(&self, id: &WorkflowId) -> Result<WorkflowHandle, ControlPlaneError>;
}
