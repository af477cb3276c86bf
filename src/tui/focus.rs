//! Focus zones and the transition table between them.
//!
//! Input is routed by the current [`Focus`]. Cycling follows a fixed order
//! and skips `Interaction` while no panel is open. Every transition goes
//! through [`FocusRouter`], which keeps the interaction input's own
//! `focused` flag in step with the router.

use super::interaction::InteractionPanel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubFocus {
    Tree,
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Focus {
    /// Workflow list.
    #[default]
    Primary,
    Secondary(SubFocus),
    /// Only reachable while the interaction panel is open.
    Interaction,
}

impl Focus {
    pub fn label(&self) -> &'static str {
        match self {
            Focus::Primary => "workflows",
            Focus::Secondary(SubFocus::Tree) => "processes",
            Focus::Secondary(SubFocus::Details) => "details",
            Focus::Interaction => "interaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Next zone for one cycle step.
pub fn transition(current: Focus, direction: Direction, panel_open: bool) -> Focus {
    use Direction::{Backward, Forward};
    use Focus::{Interaction, Primary, Secondary};
    use SubFocus::{Details, Tree};

    match (current, direction, panel_open) {
        (Primary, Forward, _) => Secondary(Tree),
        (Secondary(Tree), Forward, _) => Secondary(Details),
        (Secondary(Details), Forward, true) => Interaction,
        (Secondary(Details), Forward, false) => Primary,
        (Interaction, Forward, _) => Primary,

        (Primary, Backward, true) => Interaction,
        (Primary, Backward, false) => Secondary(Details),
        (Secondary(Details), Backward, _) => Secondary(Tree),
        (Secondary(Tree), Backward, _) => Primary,
        (Interaction, Backward, _) => Secondary(Details),
    }
}

/// Number of zones a full cycle visits.
pub fn reachable_zones(panel_open: bool) -> usize {
    if panel_open {
        4
    } else {
        3
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusRouter {
    focus: Focus,
}

impl FocusRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Focus {
        self.focus
    }

    pub fn cycle(&mut self, direction: Direction, panel: &mut InteractionPanel) -> Focus {
        // Interaction with a closed panel is not a valid state to cycle from.
        self.normalize(panel);
        self.focus = transition(self.focus, direction, panel.is_open());
        self.sync(panel);
        self.focus
    }

    /// Jumps straight to `target`, as a pointer click does. Refused when
    /// `target` is `Interaction` and no panel is open.
    pub fn focus_zone(&mut self, target: Focus, panel: &mut InteractionPanel) -> bool {
        if target == Focus::Interaction && !panel.is_open() {
            return false;
        }
        self.focus = target;
        self.sync(panel);
        true
    }

    /// Falls back to `Primary` if the panel was closed under `Interaction`.
    pub fn normalize(&mut self, panel: &mut InteractionPanel) {
        if self.focus == Focus::Interaction && !panel.is_open() {
            self.focus = Focus::Primary;
        }
        self.sync(panel);
    }

    fn sync(&self, panel: &mut InteractionPanel) {
        let focused = self.focus == Focus::Interaction && panel.is_open();
        if panel.input.is_focused() != focused {
            panel.input.set_focused(focused);
        }
    }
}

#[cfg(test)]
#[path = "tests/focus_tests.rs"]
mod tests;
