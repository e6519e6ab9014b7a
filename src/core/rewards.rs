//! Global progression state and the append-only records sessions produce.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative progression across all sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalStats {
    /// Cumulative XP. Quit penalties may push it down, even below zero.
    pub xp: i64,
    pub completed_session_count: u32,
    pub abandoned_session_count: u32,
    /// Highest milestone tier index ever unlocked.
    pub highest_tier_unlocked: Option<usize>,
    /// Sessions whose totals were folded into these stats.
    pub committed_sessions: BTreeSet<String>,
}

impl GlobalStats {
    pub fn has_committed(&self, session_id: &str) -> bool {
        self.committed_sessions.contains(session_id)
    }
}

/// Kind of a reward log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    MilestoneUnlocked,
    SessionComplete,
    SessionQuit,
}

/// Immutable reward log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: RewardKind,
    pub description: String,
    pub xp_delta: i64,
    /// Session that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RewardEvent {
    pub fn new(
        kind: RewardKind,
        description: impl Into<String>,
        xp_delta: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            description: description.into(),
            xp_delta,
            session_id: None,
        }
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Whether `other` logs the same reward, ignoring when it was written.
    pub fn same_reward(&self, other: &RewardEvent) -> bool {
        self.kind == other.kind
            && self.description == other.description
            && self.session_id == other.session_id
    }

    pub fn milestone_unlocked(tier_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            RewardKind::MilestoneUnlocked,
            format!("Milestone unlocked: {}", tier_name),
            0,
            timestamp,
        )
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Abandoned,
}

/// Audit record appended once per committed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub ended_at: DateTime<Utc>,
    /// Items that took part in the session.
    pub item_ids: Vec<String>,
    pub words_mastered: u32,
    pub total_passes: u32,
    pub total_fails: u32,
    pub xp_delta: i64,
}
