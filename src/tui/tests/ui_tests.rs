use super::*;
use crate::app::dashboard::Message;
use crate::config::DashboardConfig;
use crate::control_plane::{ControlPlaneEvent, ProcessEvent, ProcessEventKind, WorkflowSummary};
use ratatui::{backend::TestBackend, Terminal};

fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn app() -> App {
    let mut app = App::new(&DashboardConfig::default(), None);
    app.update(Message::ListLoaded(Ok(vec![
        WorkflowSummary::new("wf-1", "auth-refactor", WorkflowState::Running),
        WorkflowSummary::new("wf-2", "billing", WorkflowState::Paused),
    ])));
    app.update(Message::ControlPlane(Some(ControlPlaneEvent::process(
        "wf-1",
        ProcessEvent::coordinator(ProcessEventKind::Output).with_output("planning next step", false),
    ))));
    app
}

#[test]
fn draws_list_and_registers_zones() {
    let mut app = app();
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| draw(frame, &mut app)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("auth-refactor"));
    assert!(text.contains("billing"));
    assert!(text.contains("coordinator"));
    assert!(text.contains("planning next step"));

    assert!(app.regions.bounds(Focus::Primary).is_some());
    assert!(app.regions.bounds(Focus::Secondary(SubFocus::Tree)).is_some());
    assert!(app.regions.bounds(Focus::Secondary(SubFocus::Details)).is_some());
    assert!(app.regions.bounds(Focus::Interaction).is_none());
}

#[test]
fn open_panel_registers_interaction_zone() {
    let mut app = app();
    app.panel.open();
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| draw(frame, &mut app)).unwrap();

    assert!(app.regions.bounds(Focus::Interaction).is_some());
    assert!(buffer_text(&terminal).contains("Talk to coordinator"));
}

#[test]
fn help_overlay_and_toast_render() {
    let mut app = app();
    app.help_open = true;
    app.toasts.warning("workflow is locked by another process");
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| draw(frame, &mut app)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("Keys"));
    assert!(text.contains("workflow is locked"));
}

#[test]
fn truncation_respects_display_width() {
    assert_eq!(truncate_to_width("short", 10), "short");
    assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
    assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
}
