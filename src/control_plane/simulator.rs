//! Synthetic workflow activity for the demo mode.
//!
//! Seeds an [`InMemoryControlPlane`] with workflows and publishes a steady
//! mix of coordinator/worker output (streamed as deltas), status, queue,
//! metrics, fabric, notification and pause/resume lifecycle events until
//! cancelled.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{
    ControlPlaneEvent, EventPayload, FabricEvent, FabricEventKind, InMemoryControlPlane,
    LifecycleKind, ProcessEvent, ProcessEventKind, TokenMetrics, WorkflowId, WorkflowState,
    WorkflowSummary,
};

const NAMES: &[&str] = &[
    "auth-refactor",
    "billing-migration",
    "search-indexer",
    "flaky-test-hunt",
    "docs-overhaul",
    "cache-eviction",
    "api-v2-rollout",
    "metrics-pipeline",
];

const SENTENCES: &[&str] = &[
    "Reviewing the open tasks and assigning the next batch to workers.",
    "Worker output looks good, merging the partial results now.",
    "Found a failing assertion in the integration suite, investigating.",
    "Splitting the remaining work into two independent units.",
    "All checks pass on this branch, moving to the next milestone.",
];

const TOOL_CALLS: &[&str] = &[
    "🔧 read_file src/lib.rs",
    "🔧 run_tests --package core",
    "🔧 grep \"TODO\" src/",
];

/// Registers `count` demo workflows and returns their identities.
pub fn seed_workflows(plane: &InMemoryControlPlane, count: usize) -> Vec<WorkflowId> {
    (0..count)
        .map(|i| {
            let short: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
            let name = NAMES.get(i % NAMES.len()).copied().unwrap_or("workflow");
            let state = match i % 4 {
                0 | 1 => WorkflowState::Running,
                2 => WorkflowState::Pending,
                _ => WorkflowState::Paused,
            };
            let mut summary = WorkflowSummary::new(format!("wf-{}", short), name, state);
            if state != WorkflowState::Pending {
                summary.started_at = Some(Utc::now());
            }
            summary.epic = Some(format!("EPIC-{}", 100 + i));
            summary.locked = i == 5;
            let id = summary.id.clone();
            plane.add_workflow(summary);
            id
        })
        .collect()
}

/// Pauses a running workflow or resumes a paused one, publishing the
/// lifecycle event. Returns false when the workflow refused the change.
fn toggle_pause(plane: &InMemoryControlPlane, id: &WorkflowId) -> bool {
    let Some(state) = plane.summary(id).map(|s| s.state) else {
        return false;
    };
    let result = match state {
        WorkflowState::Running => plane.transition(
            id,
            "pause",
            &[WorkflowState::Running],
            WorkflowState::Paused,
            LifecycleKind::Paused,
        ),
        WorkflowState::Paused => plane.transition(
            id,
            "resume",
            &[WorkflowState::Paused],
            WorkflowState::Running,
            LifecycleKind::Resumed,
        ),
        _ => return false,
    };
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!(workflow = %id, error = %err, "demo lifecycle change refused");
            false
        }
    }
}

struct DemoScript {
    rng: StdRng,
    /// Words still to be streamed, per (workflow, process).
    streams: HashMap<(WorkflowId, String), Vec<String>>,
    workers: HashMap<WorkflowId, usize>,
}

impl DemoScript {
    fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            streams: HashMap::new(),
            workers: HashMap::new(),
        }
    }

    fn step(&mut self, plane: &InMemoryControlPlane, ids: &[WorkflowId]) {
        if ids.is_empty() {
            return;
        }
        let id = ids[self.rng.gen_range(0..ids.len())].clone();
        if self.rng.gen_ratio(1, 40) {
            toggle_pause(plane, &id);
            return;
        }
        let running = plane
            .summary(&id)
            .is_some_and(|s| s.state == WorkflowState::Running);
        if !running {
            return;
        }

        let worker_count = self.workers.get(&id).copied().unwrap_or(0);
        let process_id = if worker_count > 0 && self.rng.gen_bool(0.4) {
            format!("worker-{}", self.rng.gen_range(1..=worker_count))
        } else {
            super::COORDINATOR_ID.to_string()
        };
        let make = |kind: ProcessEventKind| {
            if process_id == super::COORDINATOR_ID {
                ProcessEvent::coordinator(kind)
            } else {
                ProcessEvent::worker(kind, process_id.clone())
            }
        };

        let event = match self.rng.gen_range(0..12) {
            0..=5 => self.output(&id, &process_id, make(ProcessEventKind::Output)),
            6 => make(ProcessEventKind::Working),
            7 => make(ProcessEventKind::Ready),
            8 if worker_count < 3 => {
                let n = worker_count + 1;
                self.workers.insert(id.clone(), n);
                plane.update_summary(&id, |s| s.active_workers = n);
                ProcessEvent::worker(ProcessEventKind::Spawned, format!("worker-{}", n))
                    .with_phase("implementing")
            }
            8 => make(ProcessEventKind::QueueChanged).with_queue_depth(self.rng.gen_range(0..4)),
            9 => {
                let metrics = TokenMetrics {
                    input_tokens: self.rng.gen_range(500..5_000),
                    output_tokens: self.rng.gen_range(100..2_000),
                    cache_read_tokens: 0,
                    cache_creation_tokens: 0,
                    cost_usd: 0.01,
                };
                plane.update_summary(&id, |s| s.tokens_used += metrics.total_tokens());
                make(ProcessEventKind::TokenUsage).with_metrics(metrics)
            }
            10 => {
                plane.publish(ControlPlaneEvent::new(
                    id.0.clone(),
                    EventPayload::Fabric(FabricEvent {
                        kind: FabricEventKind::MessagePosted,
                        channel: "#tasks".to_string(),
                        sender: process_id.clone(),
                        content: "status update posted".to_string(),
                        timestamp: Utc::now(),
                    }),
                ));
                return;
            }
            _ => {
                if self.rng.gen_bool(0.2) {
                    plane.publish(ControlPlaneEvent::new(
                        id.0.clone(),
                        EventPayload::Notification {
                            message: "coordinator needs input".to_string(),
                        },
                    ));
                }
                return;
            }
        };
        debug!(workflow = %id, kind = ?event.kind, "demo event");
        plane.publish(ControlPlaneEvent::process(id.0, event));
    }

    fn output(&mut self, id: &WorkflowId, process_id: &str, event: ProcessEvent) -> ProcessEvent {
        let key = (id.clone(), process_id.to_string());
        if let Some(words) = self.streams.get_mut(&key) {
            if !words.is_empty() {
                let word = words.remove(0);
                return event.with_output(format!(" {}", word), true);
            }
        }
        if self.rng.gen_bool(0.2) {
            let call = TOOL_CALLS[self.rng.gen_range(0..TOOL_CALLS.len())];
            return event.with_output(call, false);
        }
        let sentence = SENTENCES[self.rng.gen_range(0..SENTENCES.len())];
        let mut words: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
        let first = if words.is_empty() {
            String::new()
        } else {
            words.remove(0)
        };
        self.streams.insert(key, words);
        event.with_output(first, false)
    }
}

/// Publishes demo events every `interval` until `cancel` fires.
pub fn spawn(
    plane: InMemoryControlPlane,
    ids: Vec<WorkflowId>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut script = DemoScript::new();
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => script.step(&plane, &ids),
            }
        }
        debug!("demo simulator stopped");
    })
}
