//! Interaction panel: a transcript view of one process plus a text input
//! used to message it or issue slash commands.

use crate::control_plane::{WorkflowId, COORDINATOR_ID};

/// Single-line input with an explicit editing sub-mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    buffer: String,
    /// Cursor position in chars.
    cursor: usize,
    editing: bool,
    focused: bool,
}

impl TextInput {
    pub fn value(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Losing focus also leaves editing mode.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.editing = false;
        }
    }

    pub fn start_editing(&mut self) {
        if self.focused {
            self.editing = true;
        }
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    pub fn insert(&mut self, c: char) {
        let byte = self.byte_index(self.cursor);
        self.buffer.insert(byte, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let byte = self.byte_index(self.cursor - 1);
        self.buffer.remove(byte);
        self.cursor -= 1;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.chars().count() {
            self.cursor += 1;
        }
    }

    /// Takes the buffer contents, leaving the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionPanel {
    open: bool,
    workflow_id: Option<WorkflowId>,
    target: Option<String>,
    pub input: TextInput,
    pub transcript_scroll: usize,
    pub follow: bool,
}

impl InteractionPanel {
    pub fn new() -> Self {
        Self {
            follow: true,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closing blurs the input.
    pub fn close(&mut self) {
        self.open = false;
        self.input.set_focused(false);
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn workflow_id(&self) -> Option<&WorkflowId> {
        self.workflow_id.as_ref()
    }

    /// Process messages are sent to; the coordinator unless a worker was chosen.
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(COORDINATOR_ID)
    }

    pub fn set_target(&mut self, process_id: &str) {
        self.target = if process_id == COORDINATOR_ID {
            None
        } else {
            Some(process_id.to_string())
        };
        self.transcript_scroll = 0;
        self.follow = true;
    }

    /// Points the panel at another workflow's session, restoring its
    /// remembered scroll position.
    pub fn attach(&mut self, workflow_id: Option<WorkflowId>, scroll: usize, follow: bool) {
        if self.workflow_id != workflow_id {
            self.target = None;
        }
        self.workflow_id = workflow_id;
        self.transcript_scroll = scroll;
        self.follow = follow;
    }

    pub fn scroll_up(&mut self) {
        self.follow = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, max_scroll: usize) {
        if self.transcript_scroll < max_scroll {
            self.transcript_scroll += 1;
        }
        if self.transcript_scroll >= max_scroll {
            self.follow = true;
        }
    }
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
