use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::focus::{Focus, SubFocus};
use super::session::{ChatMessage, MessageRole, WorkflowSession};
use super::toast::Severity;
use crate::app::dashboard::App;
use crate::control_plane::{ProcessStatus, WorkflowState, COORDINATOR_ID};

const BORDER: Color = Color::DarkGray;
const BORDER_FOCUSED: Color = Color::Cyan;

pub fn draw(frame: &mut Frame, app: &mut App) {
    app.regions.clear();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    let (main_area, panel_area) = if app.panel.is_open() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);
        (split[0], Some(split[1]))
    } else {
        (chunks[1], None)
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(main_area);
    draw_workflow_list(frame, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(columns[1]);
    draw_tree(frame, app, right[0]);
    draw_details(frame, app, right[1]);

    if let Some(area) = panel_area {
        draw_interaction(frame, app, area);
    }

    draw_footer(frame, app, chunks[2]);

    if app.help_open {
        draw_help(frame, frame.area());
    }
}

fn zone_block(app: &App, zone: Focus, title: String) -> Block<'static> {
    let focused = app.focus.current() == zone;
    let color = if focused { BORDER_FOCUSED } else { BORDER };
    let title = if focused {
        Span::styled(title, Style::default().fg(BORDER_FOCUSED).bold())
    } else {
        Span::raw(title)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let running = app
        .workflows
        .all()
        .iter()
        .filter(|w| w.state == WorkflowState::Running)
        .count();
    let mut spans = vec![
        Span::styled(" Conductor ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(format!(
            " {} workflows, {} running | cached {}/{} | focus: {} ",
            app.workflows.all().len(),
            running,
            app.store.len(),
            app.store.max_sessions(),
            app.focus.current().label(),
        )),
    ];
    if app.stream_closed {
        spans.push(Span::styled(" disconnected ", Style::default().fg(Color::Red).bold()));
    }
    let header = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(header, area);
}

fn state_color(state: WorkflowState) -> Color {
    match state {
        WorkflowState::Running => Color::Green,
        WorkflowState::Paused => Color::Yellow,
        WorkflowState::Pending => Color::Gray,
        WorkflowState::Completed => Color::Blue,
        WorkflowState::Failed => Color::Red,
    }
}

fn draw_workflow_list(frame: &mut Frame, app: &mut App, area: Rect) {
    app.regions.register(Focus::Primary, area);
    let title = if app.workflows.filter().is_empty() {
        " Workflows ".to_string()
    } else {
        format!(" Workflows /{} ", app.workflows.filter())
    };
    let block = zone_block(app, Focus::Primary, title);
    let name_width = usize::from(area.width.saturating_sub(14));

    let items: Vec<ListItem> = app
        .workflows
        .visible()
        .map(|w| {
            let notify = app
                .store
                .get(&w.id)
                .is_some_and(|s| s.has_notification);
            let mut spans = vec![
                Span::styled(
                    format!("{:<9}", w.state.as_str()),
                    Style::default().fg(state_color(w.state)),
                ),
                Span::raw(truncate_to_width(w.display_name(), name_width)),
            ];
            if w.locked {
                spans.push(Span::styled(" 🔒", Style::default().fg(Color::DarkGray)));
            }
            if notify {
                spans.push(Span::styled(" ●", Style::default().fg(Color::Magenta)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let selected = (app.workflows.visible_len() > 0).then_some(app.workflows.selected_index());
    let mut state = ListState::default().with_selected(selected);
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
    app.list_offset = state.offset();
}

fn status_color(status: ProcessStatus) -> Color {
    match status {
        ProcessStatus::Working => Color::Green,
        ProcessStatus::Ready => Color::Cyan,
        ProcessStatus::Pending => Color::Gray,
        ProcessStatus::Stopped | ProcessStatus::Retired => Color::DarkGray,
        ProcessStatus::Failed => Color::Red,
    }
}

fn node_status(session: &WorkflowSession, node: &str) -> (ProcessStatus, usize) {
    if node == COORDINATOR_ID {
        (session.coordinator_status, session.coordinator_queue_depth)
    } else {
        session
            .workers
            .get(node)
            .map_or((ProcessStatus::Pending, 0), |w| (w.status, w.queue_depth))
    }
}

fn draw_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    let zone = Focus::Secondary(SubFocus::Tree);
    app.regions.register(zone, area);
    let block = zone_block(app, zone, " Processes ".to_string());

    let Some(session) = app.selected_session() else {
        frame.render_widget(Paragraph::new("No workflow selected").block(block), area);
        return;
    };

    let items: Vec<ListItem> = session
        .tree_nodes()
        .into_iter()
        .map(|node| {
            let (status, queue) = node_status(session, node);
            let indent = if node == COORDINATOR_ID { "" } else { "  └ " };
            let mut spans = vec![
                Span::raw(format!("{}{} ", indent, node)),
                Span::styled(status.as_str(), Style::default().fg(status_color(status))),
            ];
            if queue > 0 {
                spans.push(Span::styled(
                    format!(" [{} queued]", queue),
                    Style::default().fg(Color::Yellow),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default().with_selected(Some(session.view.tree_cursor));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn message_line(message: &ChatMessage) -> Line<'static> {
    let (label, color) = match message.role {
        MessageRole::Coordinator => ("coordinator", Color::Cyan),
        MessageRole::Worker => ("worker", Color::Green),
        MessageRole::User => ("you", Color::Magenta),
        MessageRole::System => ("system", Color::Yellow),
    };
    let content_style = if message.is_tool_call {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(color).bold()),
        Span::styled(message.content.clone(), content_style),
    ])
}

fn draw_details(frame: &mut Frame, app: &mut App, area: Rect) {
    let zone = Focus::Secondary(SubFocus::Details);
    app.regions.register(zone, area);
    let block = zone_block(app, zone, " Details ".to_string());

    let Some(session) = app.selected_session() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };
    let nodes = session.tree_nodes();
    let node = nodes
        .get(session.view.tree_cursor)
        .copied()
        .unwrap_or(COORDINATOR_ID);

    let (status, queue) = node_status(session, node);
    let metrics = if node == COORDINATOR_ID {
        session.coordinator_metrics
    } else {
        session.workers.get(node).and_then(|w| w.metrics)
    };
    let phase = session
        .workers
        .get(node)
        .and_then(|w| w.phase.clone())
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(vec![
            Span::styled(node.to_string(), Style::default().bold()),
            Span::raw(format!("  status {}  phase {}  queue {}", status.as_str(), phase, queue)),
        ]),
        Line::from(match metrics {
            Some(m) => format!(
                "tokens in {} out {} cache {}/{}  ${:.4}  (workflow total {})",
                m.input_tokens,
                m.output_tokens,
                m.cache_read_tokens,
                m.cache_creation_tokens,
                m.cost_usd,
                session.total_tokens()
            ),
            None => "no usage reported yet".to_string(),
        })
        .fg(Color::DarkGray),
    ];

    let rows = session
        .transcript_for(node)
        .iter()
        .map(message_line)
        .chain(session.fabric_log.iter().map(|f| {
            Line::from(vec![
                Span::styled(format!("{} ", f.channel), Style::default().fg(Color::Blue)),
                Span::raw(format!("{}: {}", f.sender, f.content)),
            ])
        }))
        .chain(session.command_log.iter().map(|c| {
            let outcome = if c.success { "ok" } else { "failed" };
            Line::from(format!(
                "cmd {} {} ({}, {})",
                c.command,
                c.process_id.as_deref().unwrap_or(""),
                c.source,
                outcome
            ))
            .fg(Color::DarkGray)
        }))
        .skip(session.view.details_scroll);
    lines.extend(rows);

    let details = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}

fn draw_interaction(frame: &mut Frame, app: &mut App, area: Rect) {
    app.regions.register(Focus::Interaction, area);
    let target = app.panel.target().to_string();
    let block = zone_block(app, Focus::Interaction, format!(" Talk to {} ", target));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let transcript = app
        .selected_session()
        .map(|s| s.transcript_for(&target))
        .unwrap_or(&[]);
    let height = usize::from(parts[0].height);
    let skip = if app.panel.follow {
        transcript.len().saturating_sub(height)
    } else {
        app.panel.transcript_scroll
    };
    let lines: Vec<Line> = transcript.iter().skip(skip).map(message_line).collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), parts[0]);

    let input = &app.panel.input;
    let prompt_style = if input.is_editing() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let placeholder = if input.value().is_empty() && !input.is_editing() {
        "press i to type, /stop /spawn /retire /replace"
    } else {
        input.value()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", prompt_style),
            Span::raw(placeholder.to_string()),
        ])),
        parts[1],
    );
    if input.is_editing() {
        let typed: String = input.value().chars().take(input.cursor()).collect();
        let x = parts[1]
            .x
            .saturating_add(2)
            .saturating_add(u16::try_from(typed.width()).unwrap_or(u16::MAX));
        frame.set_cursor_position((x.min(parts[1].right().saturating_sub(1)), parts[1].y));
    }
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let width = usize::from(area.width);
    let line = if app.filter_editing {
        Line::from(vec![
            Span::styled(" filter: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}_", app.workflows.filter())),
        ])
    } else if let Some(toast) = app.toasts.latest() {
        let color = match toast.severity {
            Severity::Info => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        };
        Line::from(Span::styled(
            truncate_to_width(&format!(" {}", toast.message), width),
            Style::default().fg(color),
        ))
    } else {
        Line::from(Span::styled(
            truncate_to_width(
                " Tab focus  s/x/p/a start/stop/pause/archive  / filter  Ctrl+P panel  ? help  q quit",
                width,
            ),
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

const HELP: &[(&str, &str)] = &[
    ("Tab / Shift+Tab", "cycle focus"),
    ("Ctrl+P", "toggle interaction panel"),
    ("? / F1", "toggle help"),
    ("q / Ctrl+C", "quit"),
    ("j k g G", "move / jump in focused pane"),
    ("s x p a", "start, stop, pause or resume, archive"),
    ("r", "reload workflows"),
    ("n", "acknowledge notification"),
    ("/", "filter workflows"),
    ("Enter (processes)", "talk to the highlighted process"),
    ("i / Enter (panel)", "start typing, Esc stops"),
];

fn draw_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{:<20}", keys), Style::default().fg(Color::Cyan)),
                Span::raw(*action),
            ])
        })
        .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER_FOCUSED))
            .title(" Keys "),
    );
    frame.render_widget(help, popup);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    if max > 0 {
        out.push('…');
    }
    out
}

#[cfg(test)]
#[path = "tests/ui_tests.rs"]
mod tests;
