use std::collections::BTreeMap;

use crate::{AgentId, AgentStatus};

/// Observable status change, emitted once per real transition.
///
/// `available` is the derived signal the presentation layer uses to decide
/// whether a result may be fetched for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub agent: AgentId,
    pub status: AgentStatus,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Entry {
    status: AgentStatus,
    last_write: u64,
}

/// Single source of truth for every tracked agent's status.
///
/// Any status may follow any other; writes are last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatusRegistry {
    entries: BTreeMap<AgentId, Entry>,
    write_seq: u64,
    changes: Vec<StatusChange>,
}

impl Default for AgentStatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStatusRegistry {
    pub fn new() -> Self {
        Self {
            entries: AgentId::ALL
                .into_iter()
                .map(|agent| (agent, Entry::default()))
                .collect(),
            write_seq: 0,
            changes: Vec::new(),
        }
    }

    pub fn status(&self, agent: AgentId) -> AgentStatus {
        self.entries
            .get(&agent)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    pub fn is_available(&self, agent: AgentId) -> bool {
        self.status(agent).is_available()
    }

    /// Sequence number of the most recent write to `agent`, including writes
    /// that did not change the status. Zero means never written.
    pub fn last_write(&self, agent: AgentId) -> u64 {
        self.entries
            .get(&agent)
            .map(|entry| entry.last_write)
            .unwrap_or(0)
    }

    /// Applies a status. Returns `true` when the status actually changed and a
    /// `StatusChange` was recorded.
    pub fn set(&mut self, agent: AgentId, status: AgentStatus) -> bool {
        self.write_seq += 1;
        let entry = self.entries.entry(agent).or_default();
        entry.last_write = self.write_seq;
        if entry.status == status {
            return false;
        }
        entry.status = status;
        self.changes.push(StatusChange {
            agent,
            status,
            available: status.is_available(),
        });
        true
    }

    /// Puts every agent back to pending. Returns how many agents changed.
    pub fn reset(&mut self) -> usize {
        AgentId::ALL
            .into_iter()
            .filter(|agent| self.set(*agent, AgentStatus::Pending))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, AgentStatus)> + '_ {
        self.entries
            .iter()
            .map(|(agent, entry)| (*agent, entry.status))
    }

    pub fn count(&self, status: AgentStatus) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.status == status)
            .count()
    }

    /// Drains the change records accumulated since the last call.
    pub fn take_changes(&mut self) -> Vec<StatusChange> {
        std::mem::take(&mut self.changes)
    }
}
