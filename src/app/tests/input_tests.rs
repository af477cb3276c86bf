use super::*;
use crate::app::dashboard::Message;
use crate::config::DashboardConfig;
use crate::control_plane::{
    ControlPlaneEvent, ProcessEvent, ProcessEventKind, WorkflowId, WorkflowState, WorkflowSummary,
};
use crate::tui::event::InputEvent;
use ratatui::layout::Rect;

fn app() -> App {
    let mut app = App::new(&DashboardConfig::default(), None);
    app.update(Message::ListLoaded(Ok(vec![
        WorkflowSummary::new("wf-1", "Auth refactor", WorkflowState::Running),
        WorkflowSummary::new("wf-2", "Billing", WorkflowState::Running),
        WorkflowSummary::new("wf-3", "auth cleanup", WorkflowState::Paused),
    ])));
    app
}

fn press(app: &mut App, code: KeyCode) -> Vec<Effect> {
    handle_key(app, KeyEvent::from(code))
}

fn ctrl(app: &mut App, c: char) -> Vec<Effect> {
    handle_key(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn selected(app: &App) -> Option<&str> {
    app.workflows.selected_id().map(WorkflowId::as_str)
}

fn open_editing_panel(app: &mut App) {
    ctrl(app, 'p');
    assert_eq!(app.focus.current(), Focus::Interaction);
    press(app, KeyCode::Enter);
    assert!(app.panel.input.is_editing());
}

#[test]
fn editing_swallows_shortcuts_as_text() {
    let mut app = app();
    open_editing_panel(&mut app);

    let effects = press(&mut app, KeyCode::Char('q'));
    assert!(effects.is_empty());
    assert!(!app.should_quit);
    type_text(&mut app, "?x");
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.panel.input.value(), "q?x");
    assert_eq!(app.focus.current(), Focus::Interaction);
    assert!(!app.help_open);
}

#[test]
fn escape_leaves_editing_then_shortcuts_apply() {
    let mut app = app();
    open_editing_panel(&mut app);
    press(&mut app, KeyCode::Esc);
    assert!(!app.panel.input.is_editing());
    assert_eq!(app.focus.current(), Focus::Interaction);

    assert_eq!(press(&mut app, KeyCode::Char('q')), vec![Effect::Quit]);
    assert!(app.should_quit);
}

#[test]
fn ctrl_c_quits_while_editing() {
    let mut app = app();
    open_editing_panel(&mut app);
    assert_eq!(ctrl(&mut app, 'c'), vec![Effect::Quit]);
}

#[test]
fn enter_while_editing_submits() {
    let mut app = app();
    open_editing_panel(&mut app);
    type_text(&mut app, "/spawn");
    let effects = press(&mut app, KeyCode::Enter);
    assert!(matches!(effects.as_slice(), [Effect::Submit { .. }]));
    assert!(app.panel.input.is_editing());
}

#[test]
fn keys_reach_only_the_focused_zone() {
    let mut app = app();
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus.current(), Focus::Secondary(SubFocus::Tree));

    press(&mut app, KeyCode::Down);
    assert_eq!(selected(&app), Some("wf-1"));

    press(&mut app, KeyCode::BackTab);
    press(&mut app, KeyCode::Down);
    assert_eq!(selected(&app), Some("wf-2"));
}

#[test]
fn help_is_global_and_modal() {
    let mut app = app();
    press(&mut app, KeyCode::Char('?'));
    assert!(app.help_open);
    press(&mut app, KeyCode::Down);
    assert_eq!(selected(&app), Some("wf-1"));
    press(&mut app, KeyCode::Esc);
    assert!(!app.help_open);

    press(&mut app, KeyCode::F(1));
    assert!(app.help_open);
}

#[test]
fn filter_editing_updates_and_clears() {
    let mut app = app();
    press(&mut app, KeyCode::Char('/'));
    assert!(app.filter_editing);
    type_text(&mut app, "auth");
    assert_eq!(app.workflows.visible_len(), 2);
    assert_eq!(app.workflows.selected_index(), 0);
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.workflows.filter(), "aut");
    press(&mut app, KeyCode::Enter);
    assert!(!app.filter_editing);
    assert_eq!(app.workflows.filter(), "aut");

    press(&mut app, KeyCode::Char('/'));
    press(&mut app, KeyCode::Esc);
    assert!(!app.filter_editing);
    assert_eq!(app.workflows.visible_len(), 3);
}

#[test]
fn tree_enter_targets_worker_and_focuses_panel() {
    let mut app = app();
    app.update(Message::ControlPlane(Some(ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::worker(ProcessEventKind::Spawned, "worker-1"),
    ))));
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    assert_eq!(app.selected_session().unwrap().view.tree_cursor, 1);

    press(&mut app, KeyCode::Enter);
    assert!(app.panel.is_open());
    assert_eq!(app.panel.target(), "worker-1");
    assert_eq!(app.focus.current(), Focus::Interaction);
    assert!(app.panel.input.is_focused());
}

#[test]
fn lifecycle_keys_only_in_list() {
    let mut app = app();
    assert_eq!(
        press(&mut app, KeyCode::Char('x')),
        vec![Effect::Lifecycle {
            op: LifecycleOp::Stop,
            workflow_id: WorkflowId::from("wf-1"),
        }]
    );
    assert_eq!(press(&mut app, KeyCode::Char('r')), vec![Effect::ReloadList]);

    press(&mut app, KeyCode::Tab);
    assert!(press(&mut app, KeyCode::Char('x')).is_empty());
}

#[test]
fn click_focuses_zone_and_selects_row() {
    let mut app = app();
    app.regions.register(Focus::Primary, Rect::new(0, 0, 30, 10));
    app.regions
        .register(Focus::Secondary(SubFocus::Details), Rect::new(30, 0, 50, 10));

    let click = |column, row| MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column,
        row,
        modifiers: KeyModifiers::NONE,
    };
    handle_mouse(&mut app, click(40, 4));
    assert_eq!(app.focus.current(), Focus::Secondary(SubFocus::Details));

    handle_mouse(&mut app, click(5, 3));
    assert_eq!(app.focus.current(), Focus::Primary);
    assert_eq!(selected(&app), Some("wf-3"));
}

#[test]
fn paste_goes_to_editing_input() {
    let mut app = app();
    open_editing_panel(&mut app);
    app.update(Message::Input(InputEvent::Paste("line one\nline two".to_string())));
    assert_eq!(app.panel.input.value(), "line one line two");
}
