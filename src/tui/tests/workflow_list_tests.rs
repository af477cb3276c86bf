use super::*;
use crate::control_plane::WorkflowState;
use proptest::prelude::*;

fn summaries(ids: &[&str]) -> Vec<WorkflowSummary> {
    ids.iter()
        .map(|id| WorkflowSummary::new(*id, format!("{} task", id), WorkflowState::Running))
        .collect()
}

fn selected(list: &WorkflowList) -> Option<&str> {
    list.selected_id().map(WorkflowId::as_str)
}

#[test]
fn first_reload_selects_first_row() {
    let mut list = WorkflowList::new();
    let change = list.reconcile(summaries(&["a", "b", "c"]));
    assert_eq!(change.previous, None);
    assert_eq!(selected(&list), Some("a"));
    assert!(change.changed());
}

#[test]
fn reorder_keeps_selected_identity() {
    let mut list = WorkflowList::new();
    list.reconcile(summaries(&["a", "b", "c"]));
    list.move_down();
    assert_eq!(selected(&list), Some("b"));

    let change = list.reconcile(summaries(&["new", "c", "a", "b"]));
    assert!(!change.changed());
    assert_eq!(selected(&list), Some("b"));
    assert_eq!(list.selected_index(), 3);
}

#[test]
fn removed_selection_clamps_to_last_row() {
    let mut list = WorkflowList::new();
    list.reconcile(summaries(&["a", "b", "c"]));
    list.jump_last();
    let change = list.reconcile(summaries(&["a", "b"]));
    assert!(change.changed());
    assert_eq!(list.selected_index(), 1);
    assert_eq!(selected(&list), Some("b"));
}

#[test]
fn empty_reload_clears_selection() {
    let mut list = WorkflowList::new();
    list.reconcile(summaries(&["a"]));
    let change = list.reconcile(Vec::new());
    assert_eq!(change.current, None);
    assert_eq!(list.selected_index(), 0);
}

#[test]
fn navigation_does_not_wrap() {
    let mut list = WorkflowList::new();
    list.reconcile(summaries(&["a", "b"]));
    assert!(list.move_up().is_none());
    assert!(list.move_down().is_some());
    assert!(list.move_down().is_none());
    assert_eq!(selected(&list), Some("b"));
    assert!(list.jump_last().is_none());
    assert!(list.jump_first().is_some());
}

#[test]
fn filter_is_case_insensitive_and_resets_index() {
    let mut list = WorkflowList::new();
    list.reconcile(vec![
        WorkflowSummary::new("1", "Auth Refactor", WorkflowState::Running),
        WorkflowSummary::new("2", "billing", WorkflowState::Running),
        WorkflowSummary::new("3", "AUTH cleanup", WorkflowState::Paused),
    ]);
    list.jump_last();

    let change = list.set_filter("auth");
    assert_eq!(list.visible_len(), 2);
    assert_eq!(list.selected_index(), 0);
    assert_eq!(change.current.as_ref().map(WorkflowId::as_str), Some("1"));

    list.move_down();
    assert_eq!(selected(&list), Some("3"));

    list.set_filter("");
    assert_eq!(list.visible_len(), 3);
}

#[test]
fn filter_with_no_match_has_no_selection() {
    let mut list = WorkflowList::new();
    list.reconcile(summaries(&["a", "b"]));
    let change = list.set_filter("zzz");
    assert_eq!(change.current, None);
    assert!(list.selected().is_none());
}

proptest! {
    #[test]
    fn reload_preserves_identity_when_present(
        ids in proptest::collection::hash_set("[a-z]{1,4}", 1..12),
        pick in 0usize..12,
        seed in any::<u64>(),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut list = WorkflowList::new();
        list.reconcile(summaries(&refs));
        list.select_index(pick % ids.len());
        let before = list.selected_id().cloned();

        let mut shuffled = refs.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();
        list.reconcile(summaries(&shuffled));

        prop_assert_eq!(list.selected_id().cloned(), before);
    }
}
