use super::*;
use chrono::TimeZone;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn delta_extends_previous_entry_of_same_role() {
    let mut transcript = Vec::new();
    assert!(append_output(&mut transcript, MessageRole::Coordinator, "Hello ", false, ts(1)));
    assert!(append_output(&mut transcript, MessageRole::Coordinator, "world!", true, ts(2)));
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content, "Hello world!");
}

#[test]
fn delta_never_extends_tool_call() {
    let mut transcript = Vec::new();
    append_output(
        &mut transcript,
        MessageRole::Coordinator,
        "🔧 read_file src/main.rs",
        false,
        ts(1),
    );
    append_output(&mut transcript, MessageRole::Coordinator, "done", true, ts(2));
    assert_eq!(transcript.len(), 2);
    assert!(transcript[0].is_tool_call);
    assert!(!transcript[1].is_tool_call);
}

#[test]
fn delta_after_other_role_starts_new_entry() {
    let mut transcript = vec![ChatMessage::new(MessageRole::User, "hi", ts(1))];
    append_output(&mut transcript, MessageRole::Coordinator, "hello", true, ts(2));
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].role, MessageRole::Coordinator);
}

#[test]
fn empty_output_is_discarded() {
    let mut transcript = Vec::new();
    assert!(!append_output(&mut transcript, MessageRole::Worker, "", false, ts(1)));
    assert!(transcript.is_empty());
}

#[test]
fn bounded_log_drops_oldest() {
    let mut log = BoundedLog::new(3);
    for i in 0..5 {
        log.push(i);
    }
    assert_eq!(log.len(), 3);
    assert_eq!(log.front(), Some(&2));
    assert_eq!(log.back(), Some(&4));
}

#[test]
fn workers_are_unique_and_retire_keeps_history() {
    let mut session = WorkflowSession::new(WorkflowId::from("wf-1"), 10, 10);
    assert!(session.add_worker("worker-1"));
    assert!(!session.add_worker("worker-1"));
    session.worker_mut("worker-1").transcript.push(ChatMessage::new(
        MessageRole::Worker,
        "working",
        ts(1),
    ));

    assert!(session.retire_worker("worker-1"));
    assert!(session.worker_ids.is_empty());
    let worker = &session.workers["worker-1"];
    assert!(worker.is_retired());
    assert_eq!(worker.transcript.len(), 1);
    assert_eq!(session.tree_nodes(), vec!["coordinator", "worker-1"]);
}

#[test]
fn touch_is_monotonic() {
    let mut session = WorkflowSession::new(WorkflowId::from("wf-1"), 10, 10);
    session.touch(ts(10));
    session.touch(ts(5));
    assert_eq!(session.last_updated, Some(ts(10)));
    session.touch(ts(20));
    assert_eq!(session.last_updated, Some(ts(20)));
}
