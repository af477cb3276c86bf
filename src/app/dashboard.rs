//! Dashboard state and its update function.
//!
//! The loop feeds one [`Message`] at a time into [`App::update`], which
//! mutates state and returns the [`Effect`]s to run. Effects execute as
//! detached tasks and report back with another `Message`, so nothing here
//! blocks or locks.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::commands::{parse_input, ParsedInput};
use crate::config::DashboardConfig;
use crate::control_plane::{
    humanize_error, ControlPlaneError, ControlPlaneEvent, ProcessCommand, WorkflowId,
    WorkflowState, WorkflowSummary,
};
use crate::tui::aggregator::{ApplyOutcome, EventAggregator};
use crate::tui::event::InputEvent;
use crate::tui::focus::FocusRouter;
use crate::tui::interaction::InteractionPanel;
use crate::tui::regions::ZoneRegions;
use crate::tui::session::WorkflowSession;
use crate::tui::session_store::{Clock, SessionStore};
use crate::tui::toast::ToastQueue;
use crate::tui::workflow_list::{SelectionChange, WorkflowList};

pub const LOCKED_MESSAGE: &str = "workflow is locked by another process";
pub const STREAM_CLOSED_MESSAGE: &str = "event stream closed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Start,
    Stop,
    Pause,
    Resume,
    Archive,
}

impl LifecycleOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleOp::Start => "start",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Pause => "pause",
            LifecycleOp::Resume => "resume",
            LifecycleOp::Archive => "archive",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            LifecycleOp::Start => "started",
            LifecycleOp::Stop => "stopped",
            LifecycleOp::Pause => "paused",
            LifecycleOp::Resume => "resumed",
            LifecycleOp::Archive => "archived",
        }
    }
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum Message {
    /// Next item from the event subscription; `None` once it has closed.
    ControlPlane(Option<ControlPlaneEvent>),
    ListLoaded(Result<Vec<WorkflowSummary>, ControlPlaneError>),
    LifecycleFinished {
        op: LifecycleOp,
        workflow_id: WorkflowId,
        result: Result<(), ControlPlaneError>,
    },
    Input(InputEvent),
}

impl From<InputEvent> for Message {
    fn from(input: InputEvent) -> Self {
        Message::Input(input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Wait for the next control-plane event.
    AwaitEvent,
    ReloadList,
    Lifecycle {
        op: LifecycleOp,
        workflow_id: WorkflowId,
    },
    Submit {
        workflow_id: WorkflowId,
        command: ProcessCommand,
    },
    Quit,
}

pub struct App {
    pub store: SessionStore,
    pub aggregator: EventAggregator,
    pub workflows: WorkflowList,
    pub focus: FocusRouter,
    pub panel: InteractionPanel,
    pub toasts: ToastQueue,
    pub regions: ZoneRegions,
    /// First visible row of the workflow list, as last drawn.
    pub list_offset: usize,
    pub help_open: bool,
    pub filter_editing: bool,
    pub stream_closed: bool,
    pub should_quit: bool,
    /// Sessions touched since the last [`App::take_changed`].
    changed: BTreeSet<WorkflowId>,
}

impl App {
    pub fn new(config: &DashboardConfig, clock: Option<Arc<dyn Clock>>) -> Self {
        Self {
            store: SessionStore::new(
                config.max_sessions,
                config.fabric_log_cap,
                config.command_log_cap,
            ),
            aggregator: EventAggregator::new(clock),
            workflows: WorkflowList::new(),
            focus: FocusRouter::new(),
            panel: InteractionPanel::new(),
            toasts: ToastQueue::new(config.toast_ttl()),
            regions: ZoneRegions::new(),
            list_offset: 0,
            help_open: false,
            filter_editing: false,
            stream_closed: false,
            should_quit: false,
            changed: BTreeSet::new(),
        }
    }

    /// Effects to run once the subscription is up.
    pub fn init(&self) -> Vec<Effect> {
        vec![Effect::AwaitEvent, Effect::ReloadList]
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::ControlPlane(Some(event)) => self.on_event(event),
            Message::ControlPlane(None) => {
                // Not re-armed: a closed channel yields nothing more.
                if !self.stream_closed {
                    warn!("control-plane event stream closed");
                    self.stream_closed = true;
                    self.toasts.error(STREAM_CLOSED_MESSAGE);
                }
                Vec::new()
            }
            Message::ListLoaded(Ok(list)) => {
                self.on_list_loaded(list);
                Vec::new()
            }
            Message::ListLoaded(Err(err)) => {
                warn!(error = %err, "workflow list reload failed");
                self.toasts.error(humanize_error(&err));
                Vec::new()
            }
            Message::LifecycleFinished {
                op,
                workflow_id,
                result,
            } => self.on_lifecycle_finished(op, workflow_id, result),
            Message::Input(InputEvent::Key(key)) => super::input::handle_key(self, key),
            Message::Input(InputEvent::Mouse(mouse)) => super::input::handle_mouse(self, mouse),
            Message::Input(InputEvent::Paste(text)) => super::input::handle_paste(self, &text),
            Message::Input(InputEvent::Tick) => {
                self.toasts.expire(Instant::now());
                Vec::new()
            }
            Message::Input(InputEvent::Resize(..)) => Vec::new(),
        }
    }

    fn on_event(&mut self, event: ControlPlaneEvent) -> Vec<Effect> {
        // Re-arm before anything else so delivery never stalls.
        let mut effects = vec![Effect::AwaitEvent];
        let outcome = self.aggregator.apply(&mut self.store, &event);
        if matches!(outcome, ApplyOutcome::Updated | ApplyOutcome::Removed) {
            self.changed.insert(event.workflow_id.clone());
        }
        if event.requires_reload() {
            effects.push(Effect::ReloadList);
        }
        effects
    }

    fn on_list_loaded(&mut self, list: Vec<WorkflowSummary>) {
        debug!(count = list.len(), "workflow list reloaded");
        self.store.set_running_from(&list);
        let change = self.workflows.reconcile(list);
        self.apply_selection(change);
    }

    fn on_lifecycle_finished(
        &mut self,
        op: LifecycleOp,
        workflow_id: WorkflowId,
        result: Result<(), ControlPlaneError>,
    ) -> Vec<Effect> {
        match result {
            Ok(()) => {
                info!(workflow = %workflow_id, op = %op, "lifecycle operation succeeded");
                let name = self
                    .workflows
                    .get(&workflow_id)
                    .map(|w| w.display_name().to_string())
                    .unwrap_or_else(|| workflow_id.to_string());
                self.toasts.info(format!("{} {}", name, op.past_tense()));
                vec![Effect::ReloadList]
            }
            Err(err) => {
                warn!(workflow = %workflow_id, op = %op, error = %err, "lifecycle operation failed");
                self.toasts.error(humanize_error(&err));
                Vec::new()
            }
        }
    }

    /// Moves per-session view state and cache protection to the newly
    /// selected workflow.
    pub fn apply_selection(&mut self, change: SelectionChange) {
        if !change.changed() {
            return;
        }
        if let Some(previous) = change.previous.as_ref() {
            if let Some(session) = self.store.get_mut(previous) {
                session.view.transcript_scroll = self.panel.transcript_scroll;
                session.view.follow = self.panel.follow;
            }
        }
        self.store.set_selected(change.current.clone());
        match change.current {
            Some(id) => {
                info!(workflow = %id, "workflow selected");
                let view = self.store.get_or_create(&id).view;
                self.panel
                    .attach(Some(id), view.transcript_scroll, view.follow);
            }
            None => self.panel.attach(None, 0, true),
        }
    }

    pub fn selected_session(&self) -> Option<&WorkflowSession> {
        self.workflows
            .selected_id()
            .and_then(|id| self.store.get(id))
    }

    pub fn selected_session_mut(&mut self) -> Option<&mut WorkflowSession> {
        let id = self.workflows.selected_id()?.clone();
        self.store.get_mut(&id)
    }

    /// Lifecycle action on the selected workflow. Locked workflows are refused.
    pub fn request_lifecycle(&mut self, op: LifecycleOp) -> Vec<Effect> {
        let Some(summary) = self.workflows.selected() else {
            return Vec::new();
        };
        if summary.locked {
            self.toasts.warning(LOCKED_MESSAGE);
            return Vec::new();
        }
        vec![Effect::Lifecycle {
            op,
            workflow_id: summary.id.clone(),
        }]
    }

    /// Pause a running workflow, resume a paused one.
    pub fn toggle_pause(&mut self) -> Vec<Effect> {
        let op = match self.workflows.selected().map(|w| w.state) {
            Some(WorkflowState::Paused) => LifecycleOp::Resume,
            _ => LifecycleOp::Pause,
        };
        self.request_lifecycle(op)
    }

    pub fn acknowledge_notification(&mut self) {
        if let Some(session) = self.selected_session_mut() {
            session.has_notification = false;
        }
    }

    /// Sends the interaction input through the command gateway.
    pub fn submit_input(&mut self) -> Vec<Effect> {
        let raw = self.panel.input.take();
        let Some(workflow_id) = self.panel.workflow_id().cloned() else {
            self.toasts.warning("no workflow selected");
            return Vec::new();
        };
        match parse_input(&raw, self.panel.target()) {
            ParsedInput::Command(command) => {
                debug!(workflow = %workflow_id, command = %command, "command parsed");
                vec![Effect::Submit {
                    workflow_id,
                    command,
                }]
            }
            ParsedInput::Warning(message) => {
                self.toasts.warning(message);
                Vec::new()
            }
            ParsedInput::Empty => Vec::new(),
        }
    }

    pub fn quit(&mut self) -> Vec<Effect> {
        self.should_quit = true;
        vec![Effect::Quit]
    }

    /// Drains the set of sessions changed since the previous call.
    pub fn take_changed(&mut self) -> Vec<WorkflowId> {
        std::mem::take(&mut self.changed).into_iter().collect()
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
