use super::*;
use crate::control_plane::{
    CommandLogEntry, FabricEvent, FabricEventKind, LifecycleKind, TokenMetrics, WorkflowId,
};
use crate::tui::session_store::ManualClock;
use chrono::{Duration, TimeZone, Utc};

fn setup() -> (EventAggregator, Arc<ManualClock>, SessionStore) {
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_000, 0).unwrap()));
    let aggregator = EventAggregator::new(Some(clock.clone() as Arc<dyn Clock>));
    (aggregator, clock, SessionStore::new(10, 3, 3))
}

fn wf() -> WorkflowId {
    WorkflowId::from("wf-1")
}

fn coordinator_output(text: &str, delta: bool) -> ControlPlaneEvent {
    ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::coordinator(ProcessEventKind::Output).with_output(text, delta),
    )
}

fn metrics(input: u64) -> TokenMetrics {
    TokenMetrics {
        input_tokens: input,
        output_tokens: 0,
        cache_read_tokens: 0,
        cache_creation_tokens: 0,
        cost_usd: 0.5,
    }
}

#[test]
fn hello_world_deltas_coalesce() {
    let (agg, _, mut store) = setup();
    agg.apply(&mut store, &coordinator_output("Hello ", false));
    agg.apply(&mut store, &coordinator_output("world!", true));

    let transcript = &store.get(&wf()).unwrap().coordinator_transcript;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content, "Hello world!");
}

#[test]
fn tool_call_is_not_extended_by_delta() {
    let (agg, _, mut store) = setup();
    agg.apply(&mut store, &coordinator_output("🔧 run_tests", false));
    agg.apply(&mut store, &coordinator_output("all green", true));
    assert_eq!(store.get(&wf()).unwrap().coordinator_transcript.len(), 2);
}

#[test]
fn empty_output_is_unchanged() {
    let (agg, _, mut store) = setup();
    let outcome = agg.apply(&mut store, &coordinator_output("", false));
    assert_eq!(outcome, ApplyOutcome::Unchanged);
    assert!(!store.contains(&wf()));

    agg.apply(&mut store, &coordinator_output("hi", false));
    assert_eq!(
        agg.apply(&mut store, &coordinator_output("", true)),
        ApplyOutcome::Unchanged
    );
    assert_eq!(store.get(&wf()).unwrap().coordinator_transcript.len(), 1);
}

#[test]
fn discarded_events_never_evict_cached_history() {
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_000, 0).unwrap()));
    let agg = EventAggregator::new(Some(clock.clone() as Arc<dyn Clock>));
    let mut store = SessionStore::new(2, 3, 3);
    for id in ["wf-a", "wf-b"] {
        agg.apply(
            &mut store,
            &ControlPlaneEvent::process(
                id,
                ProcessEvent::coordinator(ProcessEventKind::Output).with_output("history", false),
            ),
        );
        clock.advance(Duration::seconds(1));
    }

    let discarded = [
        ControlPlaneEvent::new(
            "wf-c",
            EventPayload::Fabric(FabricEvent {
                kind: FabricEventKind::Heartbeat,
                channel: "#general".to_string(),
                sender: "coordinator".to_string(),
                content: String::new(),
                timestamp: Utc::now(),
            }),
        ),
        ControlPlaneEvent::process(
            "wf-d",
            ProcessEvent::worker(ProcessEventKind::Output, "worker-1").with_output("", true),
        ),
        ControlPlaneEvent::process(
            "wf-e",
            ProcessEvent::coordinator(ProcessEventKind::TokenUsage).with_metrics(metrics(0)),
        ),
        ControlPlaneEvent::process("wf-f", ProcessEvent::worker(ProcessEventKind::Retired, "worker-1")),
    ];
    for event in &discarded {
        assert_eq!(agg.apply(&mut store, event), ApplyOutcome::Unchanged);
    }

    let mut ids: Vec<&str> = store.ids().map(|id| id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["wf-a", "wf-b"]);
}

#[test]
fn zero_usage_metrics_do_not_blank_known_usage() {
    let (agg, _, mut store) = setup();
    let with_usage = ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::coordinator(ProcessEventKind::TokenUsage).with_metrics(metrics(1200)),
    );
    let cost_only = ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::coordinator(ProcessEventKind::TokenUsage).with_metrics(metrics(0)),
    );
    agg.apply(&mut store, &with_usage);
    assert_eq!(agg.apply(&mut store, &cost_only), ApplyOutcome::Unchanged);
    assert_eq!(
        store.get(&wf()).unwrap().coordinator_metrics.unwrap().input_tokens,
        1200
    );
}

#[test]
fn queue_depth_only_changes_on_queue_events() {
    let (agg, _, mut store) = setup();
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::coordinator(ProcessEventKind::QueueChanged).with_queue_depth(4),
        ),
    );
    agg.apply(&mut store, &coordinator_output("text", false));
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process("wf-1", ProcessEvent::coordinator(ProcessEventKind::Ready)),
    );
    let session = store.get(&wf()).unwrap();
    assert_eq!(session.coordinator_queue_depth, 4);
    assert_eq!(session.coordinator_status, ProcessStatus::Ready);
    assert_eq!(session.coordinator_transcript.len(), 1);
}

#[test]
fn worker_spawn_is_idempotent_and_retire_keeps_history() {
    let (agg, _, mut store) = setup();
    let spawn = ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::worker(ProcessEventKind::Spawned, "worker-1"),
    );
    assert_eq!(agg.apply(&mut store, &spawn), ApplyOutcome::Updated);
    assert_eq!(agg.apply(&mut store, &spawn), ApplyOutcome::Unchanged);
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::worker(ProcessEventKind::Output, "worker-1").with_output("done", false),
        ),
    );
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::worker(ProcessEventKind::Retired, "worker-1"),
        ),
    );

    let session = store.get(&wf()).unwrap();
    assert!(session.worker_ids.is_empty());
    let worker = &session.workers["worker-1"];
    assert_eq!(worker.status, ProcessStatus::Retired);
    assert_eq!(worker.transcript[0].content, "done");
}

#[test]
fn late_status_does_not_revive_retired_worker() {
    let (agg, _, mut store) = setup();
    let worker = |kind| ControlPlaneEvent::process("wf-1", ProcessEvent::worker(kind, "worker-1"));
    agg.apply(&mut store, &worker(ProcessEventKind::Spawned));
    agg.apply(&mut store, &worker(ProcessEventKind::Retired));

    assert_eq!(
        agg.apply(&mut store, &worker(ProcessEventKind::Working)),
        ApplyOutcome::Unchanged
    );
    agg.apply(&mut store, &worker(ProcessEventKind::Ready));
    agg.apply(&mut store, &worker(ProcessEventKind::Error));

    let session = store.get(&wf()).unwrap();
    assert!(session.worker_ids.is_empty());
    let state = &session.workers["worker-1"];
    assert_eq!(state.status, ProcessStatus::Retired);
    assert_eq!(state.transcript.len(), 1);
}

#[test]
fn worker_status_and_phase_update_without_transcript() {
    let (agg, _, mut store) = setup();
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::worker(ProcessEventKind::Working, "worker-2").with_phase("testing"),
        ),
    );
    let worker = &store.get(&wf()).unwrap().workers["worker-2"];
    assert_eq!(worker.status, ProcessStatus::Working);
    assert_eq!(worker.phase.as_deref(), Some("testing"));
    assert!(worker.transcript.is_empty());
}

#[test]
fn fabric_log_keeps_only_visible_entries_and_is_bounded() {
    let (agg, _, mut store) = setup();
    let fabric = |kind, content: &str| {
        ControlPlaneEvent::new(
            "wf-1",
            EventPayload::Fabric(FabricEvent {
                kind,
                channel: "#general".to_string(),
                sender: "coordinator".to_string(),
                content: content.to_string(),
                timestamp: Utc::now(),
            }),
        )
    };
    assert_eq!(
        agg.apply(&mut store, &fabric(FabricEventKind::Heartbeat, "ping")),
        ApplyOutcome::Unchanged
    );
    for i in 0..5 {
        agg.apply(
            &mut store,
            &fabric(FabricEventKind::MessagePosted, &format!("msg {}", i)),
        );
    }
    let log = &store.get(&wf()).unwrap().fabric_log;
    assert_eq!(log.len(), 3);
    assert_eq!(log.front().unwrap().content, "msg 2");
}

#[test]
fn command_log_is_bounded() {
    let (agg, _, mut store) = setup();
    for i in 0..4 {
        agg.apply(
            &mut store,
            &ControlPlaneEvent::new(
                "wf-1",
                EventPayload::Command(CommandLogEntry {
                    command: format!("cmd-{}", i),
                    process_id: None,
                    source: "user".to_string(),
                    success: true,
                    error: None,
                    timestamp: Utc::now(),
                }),
            ),
        );
    }
    let log = &store.get(&wf()).unwrap().command_log;
    assert_eq!(log.len(), 3);
    assert_eq!(log.front().unwrap().command, "cmd-1");
}

#[test]
fn notification_sets_flag() {
    let (agg, _, mut store) = setup();
    agg.apply(
        &mut store,
        &ControlPlaneEvent::new(
            "wf-1",
            EventPayload::Notification {
                message: "needs input".to_string(),
            },
        ),
    );
    assert!(store.get(&wf()).unwrap().has_notification);
}

#[test]
fn empty_workflow_id_is_rejected() {
    let (agg, _, mut store) = setup();
    let event = ControlPlaneEvent::process(
        "",
        ProcessEvent::coordinator(ProcessEventKind::Output).with_output("x", false),
    );
    assert_eq!(agg.apply(&mut store, &event), ApplyOutcome::Rejected);
    assert!(store.is_empty());
}

#[test]
fn terminal_lifecycle_removes_session() {
    let (agg, _, mut store) = setup();
    agg.apply(&mut store, &coordinator_output("x", false));
    let created = ControlPlaneEvent::lifecycle("wf-1", LifecycleKind::Paused);
    assert_eq!(agg.apply(&mut store, &created), ApplyOutcome::Unchanged);
    assert!(store.contains(&wf()));

    let stopped = ControlPlaneEvent::lifecycle("wf-1", LifecycleKind::Failed);
    assert_eq!(agg.apply(&mut store, &stopped), ApplyOutcome::Removed);
    assert!(!store.contains(&wf()));
}

#[test]
fn clock_refreshes_last_updated() {
    let (agg, clock, mut store) = setup();
    agg.apply(&mut store, &coordinator_output("a", false));
    let first = store.get(&wf()).unwrap().last_updated.unwrap();
    clock.advance(Duration::seconds(5));
    agg.apply(&mut store, &coordinator_output("b", false));
    let second = store.get(&wf()).unwrap().last_updated.unwrap();
    assert_eq!(second - first, Duration::seconds(5));
}

#[test]
fn missing_clock_is_tolerated() {
    let agg = EventAggregator::new(None);
    let mut store = SessionStore::new(10, 3, 3);
    assert_eq!(
        agg.apply(&mut store, &coordinator_output("hi", false)),
        ApplyOutcome::Updated
    );
    assert!(store.get(&wf()).unwrap().last_updated.is_none());
}

#[test]
fn delivered_user_message_starts_user_entry() {
    let (agg, _, mut store) = setup();
    agg.apply(&mut store, &coordinator_output("thinking", false));
    agg.apply(
        &mut store,
        &ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::coordinator(ProcessEventKind::Incoming).with_message("user", "status?"),
        ),
    );
    agg.apply(&mut store, &coordinator_output("all good", true));
    let transcript = &store.get(&wf()).unwrap().coordinator_transcript;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].role, MessageRole::User);
    assert_eq!(transcript[2].content, "all good");
}
