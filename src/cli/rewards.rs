//! Rewards command for Lexis.
//!
//! Lists the reward log and, optionally, recent session records.

use serde::{Deserialize, Serialize};

use crate::core::{RewardEvent, RewardKind, SessionOutcome, SessionRecord};
use crate::error::{FailOpen, Result};
use crate::storage::ProgressionStore;

/// Options for the rewards command.
#[derive(Debug, Clone, Default)]
pub struct RewardsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of entries per list.
    pub limit: usize,
    /// Also list session records.
    pub sessions: bool,
}

/// Output format for the rewards command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Reward events, most recent first.
    pub events: Vec<RewardEvent>,
    /// Session records, most recent first (empty unless requested).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<SessionRecord>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RewardsOutput {
    /// Create a successful output.
    pub fn success(events: Vec<RewardEvent>, sessions: Vec<SessionRecord>) -> Self {
        Self {
            success: true,
            events,
            sessions,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            events: vec![],
            sessions: vec![],
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Rewards failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.events.is_empty() && self.sessions.is_empty() {
            return "No rewards yet.".to_string();
        }

        let mut lines = vec![format!("Rewards ({}):", self.events.len())];
        lines.push(String::new());

        for event in &self.events {
            let icon = match event.kind {
                RewardKind::MilestoneUnlocked => "*",
                RewardKind::SessionComplete => "+",
                RewardKind::SessionQuit => "-",
            };
            lines.push(format!(
                "{} {}  {:>+6} XP  {}",
                icon,
                event.timestamp.format("%Y-%m-%d %H:%M"),
                event.xp_delta,
                event.description
            ));
        }

        if !self.sessions.is_empty() {
            lines.push(String::new());
            lines.push(format!("Sessions ({}):", self.sessions.len()));
            lines.push(String::new());
            lines.push(format!(
                "{:<24}  {:<10}  {:>5}  {:>8}  {:>5}  {:>6}",
                "SESSION", "OUTCOME", "WORDS", "MASTERED", "FAILS", "XP"
            ));
            lines.push("-".repeat(72));
            for record in &self.sessions {
                let outcome = match record.outcome {
                    SessionOutcome::Completed => "completed",
                    SessionOutcome::Abandoned => "abandoned",
                };
                lines.push(format!(
                    "{:<24}  {:<10}  {:>5}  {:>8}  {:>5}  {:>+6}",
                    record.session_id,
                    outcome,
                    record.item_ids.len(),
                    record.words_mastered,
                    record.total_fails,
                    record.xp_delta
                ));
            }
        }

        lines.join("\n")
    }
}

/// The rewards command implementation.
pub struct RewardsCommand<P: ProgressionStore> {
    store: P,
}

impl<P: ProgressionStore> RewardsCommand<P> {
    /// Create a new rewards command.
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Run the rewards command.
    pub fn run(&self, options: &RewardsOptions) -> RewardsOutput {
        match self.load(options) {
            Ok((events, sessions)) => RewardsOutput::success(events, sessions),
            Err(e) => RewardsOutput::failure(format!("Failed to read rewards: {}", e)),
        }
    }

    fn load(&self, options: &RewardsOptions) -> Result<(Vec<RewardEvent>, Vec<SessionRecord>)> {
        let events = self.store.list_reward_events(options.limit)?;
        // Session records are supplementary; a damaged log only hides them
        let sessions = if options.sessions {
            self.store
                .list_session_records(options.limit)
                .fail_open_default("listing session records")
        } else {
            Vec::new()
        };
        Ok((events, sessions))
    }
}
