//! Key and pointer routing.
//!
//! Global actions are checked first. While the interaction input is editing,
//! every other key goes to it (Esc leaves editing). Otherwise the key goes
//! to exactly one zone handler, picked by the current focus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use super::dashboard::{App, Effect, LifecycleOp};
use crate::tui::focus::{Direction, Focus, SubFocus};

pub fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return app.quit(),
        KeyCode::Char('p') if ctrl => {
            toggle_panel(app);
            return Vec::new();
        }
        KeyCode::F(1) => {
            app.help_open = !app.help_open;
            return Vec::new();
        }
        _ => {}
    }

    if app.focus.current() == Focus::Interaction && app.panel.input.is_editing() {
        return handle_editing_key(app, key);
    }
    if app.filter_editing {
        handle_filter_key(app, key);
        return Vec::new();
    }

    match key.code {
        KeyCode::Char('q') => return app.quit(),
        KeyCode::Char('?') => {
            app.help_open = !app.help_open;
            return Vec::new();
        }
        _ => {}
    }

    if app.help_open {
        if key.code == KeyCode::Esc {
            app.help_open = false;
        }
        return Vec::new();
    }

    match key.code {
        KeyCode::Tab => {
            app.focus.cycle(Direction::Forward, &mut app.panel);
            return Vec::new();
        }
        KeyCode::BackTab => {
            app.focus.cycle(Direction::Backward, &mut app.panel);
            return Vec::new();
        }
        _ => {}
    }

    match app.focus.current() {
        Focus::Primary => handle_list_key(app, key),
        Focus::Secondary(SubFocus::Tree) => handle_tree_key(app, key),
        Focus::Secondary(SubFocus::Details) => handle_details_key(app, key),
        Focus::Interaction => handle_interaction_key(app, key),
    }
}

fn toggle_panel(app: &mut App) {
    app.panel.toggle();
    if app.panel.is_open() {
        app.focus.focus_zone(Focus::Interaction, &mut app.panel);
    } else {
        app.focus.normalize(&mut app.panel);
    }
}

fn handle_list_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    let change = match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.workflows.move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.workflows.move_down(),
        KeyCode::Home | KeyCode::Char('g') => app.workflows.jump_first(),
        KeyCode::End | KeyCode::Char('G') => app.workflows.jump_last(),
        KeyCode::Char('/') => {
            app.filter_editing = true;
            None
        }
        KeyCode::Esc if !app.workflows.filter().is_empty() => Some(app.workflows.set_filter("")),
        KeyCode::Enter => {
            app.focus
                .focus_zone(Focus::Secondary(SubFocus::Tree), &mut app.panel);
            None
        }
        KeyCode::Char('s') => return app.request_lifecycle(LifecycleOp::Start),
        KeyCode::Char('x') => return app.request_lifecycle(LifecycleOp::Stop),
        KeyCode::Char('p') => return app.toggle_pause(),
        KeyCode::Char('a') => return app.request_lifecycle(LifecycleOp::Archive),
        KeyCode::Char('r') => return vec![Effect::ReloadList],
        KeyCode::Char('n') => {
            app.acknowledge_notification();
            None
        }
        _ => None,
    };
    if let Some(change) = change {
        app.apply_selection(change);
    }
    Vec::new()
}

fn handle_filter_key(app: &mut App, key: KeyEvent) {
    let mut filter = app.workflows.filter().to_string();
    match key.code {
        KeyCode::Esc => {
            app.filter_editing = false;
            filter.clear();
        }
        KeyCode::Enter => {
            app.filter_editing = false;
            return;
        }
        KeyCode::Backspace => {
            if filter.pop().is_none() {
                return;
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => filter.push(c),
        _ => return,
    }
    let change = app.workflows.set_filter(&filter);
    app.apply_selection(change);
}

fn handle_tree_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => move_tree_cursor(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_tree_cursor(app, 1),
        KeyCode::Enter => open_tree_node(app),
        KeyCode::Char('n') => app.acknowledge_notification(),
        KeyCode::Esc => {
            app.focus.focus_zone(Focus::Primary, &mut app.panel);
        }
        _ => {}
    }
    Vec::new()
}

fn move_tree_cursor(app: &mut App, delta: isize) {
    let Some(session) = app.selected_session_mut() else {
        return;
    };
    let last = session.tree_nodes().len().saturating_sub(1);
    let next = session
        .view
        .tree_cursor
        .saturating_add_signed(delta)
        .min(last);
    if next != session.view.tree_cursor {
        session.view.tree_cursor = next;
        session.view.details_scroll = 0;
    }
}

fn open_tree_node(app: &mut App) {
    let node = app.selected_session().and_then(|session| {
        session
            .tree_nodes()
            .get(session.view.tree_cursor)
            .map(|n| n.to_string())
    });
    let Some(node) = node else {
        return;
    };
    app.panel.set_target(&node);
    app.panel.open();
    app.focus.focus_zone(Focus::Interaction, &mut app.panel);
}

fn handle_details_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    if key.code == KeyCode::Char('n') {
        app.acknowledge_notification();
        return Vec::new();
    }
    if key.code == KeyCode::Esc {
        app.focus.focus_zone(Focus::Primary, &mut app.panel);
        return Vec::new();
    }
    let Some(session) = app.selected_session_mut() else {
        return Vec::new();
    };
    let node = session
        .tree_nodes()
        .get(session.view.tree_cursor)
        .map(|n| n.to_string())
        .unwrap_or_default();
    let max = session.detail_rows(&node).saturating_sub(1);
    let scroll = &mut session.view.details_scroll;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => *scroll = scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *scroll = (*scroll + 1).min(max),
        KeyCode::Home | KeyCode::Char('g') => *scroll = 0,
        KeyCode::End | KeyCode::Char('G') => *scroll = max,
        _ => {}
    }
    Vec::new()
}

fn handle_interaction_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('i') => app.panel.input.start_editing(),
        KeyCode::Up | KeyCode::Char('k') => app.panel.scroll_up(),
        KeyCode::Down | KeyCode::Char('j') => {
            let max = transcript_max_scroll(app);
            app.panel.scroll_down(max);
        }
        KeyCode::End | KeyCode::Char('G') => {
            app.panel.transcript_scroll = transcript_max_scroll(app);
            app.panel.follow = true;
        }
        KeyCode::Esc => {
            app.focus.focus_zone(Focus::Primary, &mut app.panel);
        }
        _ => {}
    }
    Vec::new()
}

fn transcript_max_scroll(app: &App) -> usize {
    app.selected_session()
        .map(|s| s.transcript_for(app.panel.target()).len().saturating_sub(1))
        .unwrap_or(0)
}

fn handle_editing_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    let input = &mut app.panel.input;
    match key.code {
        KeyCode::Esc => input.stop_editing(),
        KeyCode::Enter => return app.submit_input(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => {}
    }
    Vec::new()
}

pub fn handle_paste(app: &mut App, text: &str) -> Vec<Effect> {
    let flattened = text.replace(['\r', '\n'], " ");
    if app.focus.current() == Focus::Interaction && app.panel.input.is_editing() {
        for c in flattened.chars() {
            app.panel.input.insert(c);
        }
    } else if app.filter_editing {
        let filter = format!("{}{}", app.workflows.filter(), flattened);
        let change = app.workflows.set_filter(&filter);
        app.apply_selection(change);
    }
    Vec::new()
}

/// Clicks focus the zone under the pointer. Wheel events scroll the
/// focused zone.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) -> Vec<Effect> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(zone) = app.regions.zone_at(mouse.column, mouse.row) else {
                return Vec::new();
            };
            app.focus.focus_zone(zone, &mut app.panel);
            if zone == Focus::Primary {
                select_clicked_row(app, mouse.row);
            }
            Vec::new()
        }
        MouseEventKind::ScrollUp => handle_key(app, KeyEvent::from(KeyCode::Up)),
        MouseEventKind::ScrollDown => handle_key(app, KeyEvent::from(KeyCode::Down)),
        _ => Vec::new(),
    }
}

fn select_clicked_row(app: &mut App, row: u16) {
    let Some(bounds) = app.regions.bounds(Focus::Primary) else {
        return;
    };
    // Skip the top border.
    let Some(offset) = row.checked_sub(bounds.y.saturating_add(1)) else {
        return;
    };
    let index = app.list_offset + usize::from(offset);
    if let Some(change) = app.workflows.select_index(index) {
        app.apply_selection(change);
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
