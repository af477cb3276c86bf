//! Bounded cache of per-workflow sessions.
//!
//! Capacity is soft: the selected workflow and every workflow whose list
//! state is running are never evicted, so the cache can exceed
//! `max_sessions` by at most the number of protected sessions.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::session::WorkflowSession;
use crate::control_plane::{WorkflowId, WorkflowState, WorkflowSummary};

/// Source of wall-clock time for `last_updated` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SessionStore {
    sessions: HashMap<WorkflowId, WorkflowSession>,
    max_sessions: usize,
    fabric_cap: usize,
    command_cap: usize,
    selected: Option<WorkflowId>,
    running: HashSet<WorkflowId>,
}

impl SessionStore {
    pub fn new(max_sessions: usize, fabric_cap: usize, command_cap: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions: max_sessions.max(1),
            fabric_cap,
            command_cap,
            selected: None,
            running: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn contains(&self, id: &WorkflowId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &WorkflowId) -> Option<&WorkflowSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &WorkflowId) -> Option<&mut WorkflowSession> {
        self.sessions.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkflowId> {
        self.sessions.keys()
    }

    pub fn selected(&self) -> Option<&WorkflowId> {
        self.selected.as_ref()
    }

    pub fn set_selected(&mut self, id: Option<WorkflowId>) {
        self.selected = id;
        self.trim_to_capacity();
    }

    /// Replaces the set of running workflows from a fresh list snapshot.
    pub fn set_running_from(&mut self, list: &[WorkflowSummary]) {
        self.running = list
            .iter()
            .filter(|w| w.state == WorkflowState::Running)
            .map(|w| w.id.clone())
            .collect();
        self.trim_to_capacity();
    }

    pub fn mark_running(&mut self, id: &WorkflowId, running: bool) {
        if running {
            self.running.insert(id.clone());
        } else {
            self.running.remove(id);
        }
        self.trim_to_capacity();
    }

    pub fn is_protected(&self, id: &WorkflowId) -> bool {
        self.selected.as_ref() == Some(id) || self.running.contains(id)
    }

    /// Number of cached sessions exempt from eviction.
    pub fn protected_count(&self) -> usize {
        self.sessions
            .keys()
            .filter(|id| self.is_protected(id))
            .count()
    }

    /// Returns the session for `id`, creating it when absent and evicting
    /// if the cache went over capacity.
    pub fn get_or_create(&mut self, id: &WorkflowId) -> &mut WorkflowSession {
        if !self.sessions.contains_key(id) {
            debug!(workflow = %id, "creating session");
            self.sessions.insert(
                id.clone(),
                WorkflowSession::new(id.clone(), self.fabric_cap, self.command_cap),
            );
            if self.sessions.len() > self.max_sessions {
                self.evict_excluding(Some(id));
            }
        }
        let (fabric_cap, command_cap) = (self.fabric_cap, self.command_cap);
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| WorkflowSession::new(id.clone(), fabric_cap, command_cap))
    }

    /// Drops the session immediately (terminal lifecycle events).
    pub fn remove(&mut self, id: &WorkflowId) -> Option<WorkflowSession> {
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            info!(workflow = %id, "session removed");
        }
        removed
    }

    /// Evicts the least recently updated unprotected session, if any.
    pub fn evict(&mut self) -> Option<WorkflowId> {
        self.evict_excluding(None)
    }

    /// Evicts until within capacity or only protected sessions remain.
    /// Runs whenever protection is released.
    fn trim_to_capacity(&mut self) {
        while self.sessions.len() > self.max_sessions {
            if self.evict().is_none() {
                break;
            }
        }
    }

    fn evict_excluding(&mut self, keep: Option<&WorkflowId>) -> Option<WorkflowId> {
        let victim = self
            .sessions
            .values()
            .filter(|s| Some(&s.workflow_id) != keep && !self.is_protected(&s.workflow_id))
            .min_by(|a, b| {
                a.last_updated
                    .cmp(&b.last_updated)
                    .then_with(|| a.workflow_id.cmp(&b.workflow_id))
            })
            .map(|s| s.workflow_id.clone())?;
        self.sessions.remove(&victim);
        info!(workflow = %victim, size = self.sessions.len(), "session evicted");
        Some(victim)
    }
}

#[cfg(test)]
#[path = "tests/session_store_tests.rs"]
mod tests;
