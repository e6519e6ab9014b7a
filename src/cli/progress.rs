//! Progress command for Lexis.
//!
//! Shows cumulative XP, the current milestone tier and the distance to the
//! next one.

use serde::{Deserialize, Serialize};

use crate::core::GlobalStats;
use crate::milestones::MilestoneEvaluator;
use crate::storage::ProgressionStore;

/// Options for the progress command.
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A tier for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInfo {
    pub name: String,
    pub threshold: i64,
}

/// Output format for the progress command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressOutput {
    /// Whether the command was successful.
    pub success: bool,
    pub xp: i64,
    pub completed_sessions: u32,
    pub abandoned_sessions: u32,
    pub current_tier: TierInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<TierInfo>,
    /// Progress from the current tier to the next, in `[0, 1]`.
    pub progress: f64,
    /// Tiers unlocked so far, including ones XP has since dropped below.
    pub unlocked: Vec<String>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressOutput {
    /// Build the output from stored stats.
    pub fn from_stats(global: &GlobalStats, milestones: &MilestoneEvaluator) -> Self {
        let current = milestones.current_tier(global.xp);
        let unlocked = match global.highest_tier_unlocked {
            Some(highest) => milestones
                .tiers()
                .iter()
                .take(highest + 1)
                .map(|t| t.name.clone())
                .collect(),
            None => Vec::new(),
        };

        Self {
            success: true,
            xp: global.xp,
            completed_sessions: global.completed_session_count,
            abandoned_sessions: global.abandoned_session_count,
            current_tier: TierInfo {
                name: current.tier.name.clone(),
                threshold: current.tier.threshold,
            },
            next_tier: milestones.next_tier(global.xp).map(|next| TierInfo {
                name: next.tier.name.clone(),
                threshold: next.tier.threshold,
            }),
            progress: milestones.progress_fraction(global.xp),
            unlocked,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            xp: 0,
            completed_sessions: 0,
            abandoned_sessions: 0,
            current_tier: TierInfo {
                name: String::new(),
                threshold: 0,
            },
            next_tier: None,
            progress: 0.0,
            unlocked: vec![],
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Progress failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![
            format!("XP: {}", self.xp),
            format!("Tier: {}", self.current_tier.name),
        ];

        match &self.next_tier {
            Some(next) => {
                const BAR_WIDTH: usize = 20;
                let filled = (self.progress * BAR_WIDTH as f64).round() as usize;
                let filled = filled.min(BAR_WIDTH);
                lines.push(format!(
                    "Next:  {} at {} XP  [{}{}] {:.0}%",
                    next.name,
                    next.threshold,
                    "#".repeat(filled),
                    "-".repeat(BAR_WIDTH - filled),
                    self.progress * 100.0
                ));
            }
            None => lines.push("Next:  all tiers reached".to_string()),
        }

        lines.push(format!(
            "Sessions: {} completed, {} abandoned",
            self.completed_sessions, self.abandoned_sessions
        ));

        if !self.unlocked.is_empty() {
            lines.push(format!("Unlocked: {}", self.unlocked.join(", ")));
        }

        lines.join("\n")
    }
}

/// The progress command implementation.
pub struct ProgressCommand<P: ProgressionStore> {
    store: P,
    milestones: MilestoneEvaluator,
}

impl<P: ProgressionStore> ProgressCommand<P> {
    /// Create a new progress command.
    pub fn new(store: P, milestones: MilestoneEvaluator) -> Self {
        Self { store, milestones }
    }

    /// Run the progress command.
    pub fn run(&self, _options: &ProgressOptions) -> ProgressOutput {
        match self.store.global_stats() {
            Ok(global) => ProgressOutput::from_stats(&global, &self.milestones),
            Err(e) => ProgressOutput::failure(format!("Failed to load progress: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestones::{Tier, START_TIER_NAME};
    use crate::storage::MemoryProgressionStore;

    fn milestones() -> MilestoneEvaluator {
        MilestoneEvaluator::new(vec![
            Tier::new(100, "Bronze"),
            Tier::new(300, "Silver"),
        ])
        .unwrap()
    }

    #[test]
    fn test_progress_fresh_store() {
        let cmd = ProgressCommand::new(MemoryProgressionStore::new(), milestones());
        let output = cmd.run(&ProgressOptions::default());

        assert!(output.success);
        assert_eq!(output.xp, 0);
        assert_eq!(output.current_tier.name, START_TIER_NAME);
        assert_eq!(output.next_tier.as_ref().unwrap().name, "Bronze");
        assert!(output.unlocked.is_empty());
    }

    #[test]
    fn test_progress_keeps_unlocks_after_penalty() {
        let store = MemoryProgressionStore::new();
        store
            .set_global_stats(&GlobalStats {
                xp: 250,
                completed_session_count: 4,
                abandoned_session_count: 1,
                highest_tier_unlocked: Some(1),
                ..Default::default()
            })
            .unwrap();

        let output = ProgressCommand::new(store, milestones()).run(&ProgressOptions::default());
        assert_eq!(output.current_tier.name, "Bronze");
        assert_eq!(output.unlocked, vec!["Bronze", "Silver"]);
        assert!((output.progress - 0.75).abs() < 1e-9);

        let text = output.format_text();
        assert!(text.contains("XP: 250"));
        assert!(text.contains("Next:  Silver at 300 XP"));
        assert!(text.contains("75%"));
        assert!(text.contains("4 completed, 1 abandoned"));
    }

    #[test]
    fn test_progress_top_tier() {
        let global = GlobalStats {
            xp: 1_000,
            highest_tier_unlocked: Some(1),
            ..Default::default()
        };
        let output = ProgressOutput::from_stats(&global, &milestones());
        assert!(output.next_tier.is_none());
        assert_eq!(output.progress, 1.0);
        assert!(output.format_text().contains("all tiers reached"));
    }

    #[test]
    fn test_progress_failure() {
        let text = ProgressOutput::failure("Test error").format_text();
        assert!(text.contains("Test error"));
    }
}
