//! Append-only history ledger.
//!
//! Both state machines record every accepted transition here. Entries are
//! ordered by time of acceptance; the aggregate's version counter breaks
//! ties when the clock does not advance between two mutations. Once
//! appended, an entry is never mutated, removed, or reordered.

use chrono::{DateTime, Utc};
use connect_types::SubjectId;
use serde::{Deserialize, Serialize};

/// One recorded transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<T> {
    pub value: T,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<SubjectId>,
}

/// Ordered, append-only log of transitions.
///
/// Readers get a point-in-time snapshot via [`History::entries`]; there is
/// no mutable access to past entries. Timestamps are server-assigned and
/// only guaranteed to be monotonically non-decreasing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History<T> {
    entries: Vec<HistoryEntry<T>>,
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Seed a ledger with its first entry, as done once at aggregate creation.
    pub fn seeded(value: T, timestamp: DateTime<Utc>, actor: Option<SubjectId>) -> Self {
        let mut history = Self::new();
        history.append(value, timestamp, actor);
        history
    }

    /// Record one accepted transition.
    pub fn append(&mut self, value: T, timestamp: DateTime<Utc>, actor: Option<SubjectId>) {
        self.entries.push(HistoryEntry {
            value,
            timestamp,
            actor,
        });
    }

    /// Point-in-time snapshot of all entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry<T>] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry<T>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
