//! Terminal-less mode: runs the same update loop and prints one JSON line
//! per workflow session that changed during a turn.

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::dashboard::App;
use super::runtime::{EventLoop, Frontend};
use crate::config::DashboardConfig;
use crate::control_plane::{ControlPlane, WorkflowId};
use crate::tui::event::InputPump;
use crate::tui::session_store::SystemClock;

pub struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn status_line(app: &App, id: &WorkflowId) -> serde_json::Value {
        let name = app.workflows.get(id).map(|w| w.display_name().to_string());
        match app.store.get(id) {
            Some(session) => json!({
                "workflow_id": id.as_str(),
                "name": name,
                "coordinator_status": session.coordinator_status.as_str(),
                "queue_depth": session.coordinator_queue_depth,
                "transcript_entries": session.coordinator_transcript.len(),
                "last_message": session.coordinator_transcript.last().map(|m| m.content.clone()),
                "active_workers": session.worker_ids,
                "total_tokens": session.total_tokens(),
                "fabric_entries": session.fabric_log.len(),
                "commands": session.command_log.len(),
                "has_notification": session.has_notification,
                "last_updated": session.last_updated,
            }),
            None => json!({
                "workflow_id": id.as_str(),
                "name": name,
                "removed": true,
            }),
        }
    }
}

impl<W: Write> Frontend for JsonLines<W> {
    fn render(&mut self, app: &mut App) -> Result<()> {
        for id in app.take_changed() {
            let line = Self::status_line(app, &id);
            writeln!(self.out, "{}", line).context("Failed to write status line")?;
        }
        self.out.flush().context("Failed to flush status output")?;
        Ok(())
    }
}

/// Runs until `cancel` fires (Ctrl+C in the binary).
pub async fn run_headless(
    plane: Arc<dyn ControlPlane>,
    config: &DashboardConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut event_loop = EventLoop::connect(plane, cancel.clone())
        .await
        .context("Failed to subscribe to the control plane")?;
    let ticks = InputPump::spawn_ticks(config.tick_rate(), event_loop.sender(), cancel.child_token());
    let mut app = App::new(config, Some(Arc::new(SystemClock)));
    let mut frontend = JsonLines::new(std::io::stdout());
    info!("headless dashboard started");

    let result = event_loop.run(&mut app, &mut frontend).await;
    event_loop.shutdown();
    ticks.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dashboard::Message;
    use crate::control_plane::{
        ControlPlaneEvent, LifecycleKind, ProcessEvent, ProcessEventKind,
    };

    #[test]
    fn prints_changed_sessions_once() {
        let mut app = App::new(&DashboardConfig::default(), None);
        app.update(Message::ControlPlane(Some(ControlPlaneEvent::process(
            "wf-1",
            ProcessEvent::coordinator(ProcessEventKind::Output).with_output("hi", false),
        ))));
        let mut frontend = JsonLines::new(Vec::new());
        frontend.render(&mut app).unwrap();
        frontend.render(&mut app).unwrap();

        let out = String::from_utf8(frontend.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["workflow_id"], "wf-1");
        assert_eq!(value["last_message"], "hi");
    }

    #[test]
    fn removed_sessions_are_reported() {
        let mut app = App::new(&DashboardConfig::default(), None);
        app.update(Message::ControlPlane(Some(ControlPlaneEvent::lifecycle(
            "wf-9",
            LifecycleKind::Stopped,
        ))));
        let mut frontend = JsonLines::new(Vec::new());
        frontend.render(&mut app).unwrap();
        let out = String::from_utf8(frontend.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["removed"], true);
    }
}
