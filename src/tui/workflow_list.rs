//! Workflow list with identity-stable selection.
//!
//! Reloads replace the whole list and may reorder it, so the selected
//! workflow identity is authoritative and the index is derived from it.
//! Navigation works on the filtered view and never wraps.

use crate::control_plane::{WorkflowId, WorkflowSummary};

/// Selection identity before and after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<WorkflowId>,
    pub current: Option<WorkflowId>,
}

impl SelectionChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowList {
    all: Vec<WorkflowSummary>,
    filter: String,
    /// Indices into `all` that pass the filter, in list order.
    visible: Vec<usize>,
    selected_idx: usize,
    selected_id: Option<WorkflowId>,
}

impl WorkflowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[WorkflowSummary] {
        &self.all
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn selected_index(&self) -> usize {
        self.selected_idx
    }

    pub fn selected_id(&self) -> Option<&WorkflowId> {
        self.selected_id.as_ref()
    }

    pub fn selected(&self) -> Option<&WorkflowSummary> {
        self.visible
            .get(self.selected_idx)
            .and_then(|&i| self.all.get(i))
    }

    pub fn visible(&self) -> impl Iterator<Item = &WorkflowSummary> {
        self.visible.iter().filter_map(|&i| self.all.get(i))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn get(&self, id: &WorkflowId) -> Option<&WorkflowSummary> {
        self.all.iter().find(|w| &w.id == id)
    }

    /// Replaces the list from a reload, keeping the selected identity when
    /// it is still present and clamping the index otherwise.
    pub fn reconcile(&mut self, list: Vec<WorkflowSummary>) -> SelectionChange {
        let previous = self.selected_id.clone();
        self.all = list;
        self.rebuild_visible();

        let found = previous
            .as_ref()
            .and_then(|id| self.position_of(id));
        self.selected_idx = match found {
            Some(idx) => idx,
            None => self.selected_idx.min(self.visible.len().saturating_sub(1)),
        };
        self.sync_selected_id();
        SelectionChange {
            previous,
            current: self.selected_id.clone(),
        }
    }

    /// Case-insensitive substring filter on display names. Resets the index.
    pub fn set_filter(&mut self, filter: &str) -> SelectionChange {
        let previous = self.selected_id.clone();
        self.filter = filter.to_string();
        self.rebuild_visible();
        self.selected_idx = 0;
        self.sync_selected_id();
        SelectionChange {
            previous,
            current: self.selected_id.clone(),
        }
    }

    pub fn move_up(&mut self) -> Option<SelectionChange> {
        if self.selected_idx == 0 {
            return None;
        }
        self.select_index(self.selected_idx - 1)
    }

    pub fn move_down(&mut self) -> Option<SelectionChange> {
        if self.selected_idx + 1 >= self.visible.len() {
            return None;
        }
        self.select_index(self.selected_idx + 1)
    }

    pub fn jump_first(&mut self) -> Option<SelectionChange> {
        self.select_index(0)
    }

    pub fn jump_last(&mut self) -> Option<SelectionChange> {
        self.select_index(self.visible.len().saturating_sub(1))
    }

    /// Selects a row of the filtered view. `None` if out of range or unchanged.
    pub fn select_index(&mut self, idx: usize) -> Option<SelectionChange> {
        if idx >= self.visible.len() || idx == self.selected_idx {
            return None;
        }
        let previous = self.selected_id.clone();
        self.selected_idx = idx;
        self.sync_selected_id();
        Some(SelectionChange {
            previous,
            current: self.selected_id.clone(),
        })
    }

    fn position_of(&self, id: &WorkflowId) -> Option<usize> {
        self.visible
            .iter()
            .position(|&i| self.all.get(i).is_some_and(|w| &w.id == id))
    }

    fn rebuild_visible(&mut self) {
        let needle = self.filter.to_lowercase();
        self.visible = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, w)| needle.is_empty() || w.display_name().to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
    }

    fn sync_selected_id(&mut self) {
        self.selected_id = self.selected().map(|w| w.id.clone());
    }
}

#[cfg(test)]
#[path = "tests/workflow_list_tests.rs"]
mod tests;
