//! XP milestones.
//!
//! Tiers are an ascending list of `(threshold, name)` pairs. Below the first
//! threshold the learner sits in a virtual "Start" tier at 0 XP. Unlocks are
//! tracked by the highest tier index ever reached, so XP lost to quit
//! penalties never causes a tier to be announced twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{GlobalStats, RewardEvent};
use crate::error::{LexisError, Result};

/// Name of the virtual tier below the first threshold.
pub const START_TIER_NAME: &str = "Start";

/// A named achievement level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: i64,
    pub name: String,
}

impl Tier {
    pub fn new(threshold: i64, name: impl Into<String>) -> Self {
        Self {
            threshold,
            name: name.into(),
        }
    }
}

/// Default tier ladder.
pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new(100, "Novice"),
        Tier::new(500, "Apprentice"),
        Tier::new(1_500, "Scholar"),
        Tier::new(4_000, "Linguist"),
        Tier::new(10_000, "Polyglot"),
        Tier::new(25_000, "Lexicographer"),
    ]
}

/// A tier together with its position in the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRef<'a> {
    /// Index into the ladder; `None` for the virtual start tier.
    pub index: Option<usize>,
    pub tier: &'a Tier,
}

/// Maps cumulative XP to tiers and detects unlocks.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneEvaluator {
    tiers: Vec<Tier>,
    start: Tier,
}

impl Default for MilestoneEvaluator {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            start: Tier::new(0, START_TIER_NAME),
        }
    }
}

impl MilestoneEvaluator {
    /// Create an evaluator from a ladder.
    ///
    /// Thresholds must be strictly ascending.
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold >= w[1].threshold) {
            return Err(LexisError::config(format!(
                "milestone thresholds must ascend: '{}' ({}) is not below '{}' ({})",
                pair[0].name, pair[0].threshold, pair[1].name, pair[1].threshold
            )));
        }
        Ok(Self {
            tiers,
            start: Tier::new(0, START_TIER_NAME),
        })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Index of the highest tier whose threshold is at most `xp`.
    pub fn tier_index(&self, xp: i64) -> Option<usize> {
        self.tiers.iter().rposition(|t| t.threshold <= xp)
    }

    /// Highest tier reached at `xp`, or the start tier.
    pub fn current_tier(&self, xp: i64) -> TierRef<'_> {
        match self.tier_index(xp) {
            Some(index) => TierRef {
                index: Some(index),
                tier: &self.tiers[index],
            },
            None => TierRef {
                index: None,
                tier: &self.start,
            },
        }
    }

    /// Lowest tier above `xp`, if any.
    pub fn next_tier(&self, xp: i64) -> Option<TierRef<'_>> {
        self.tiers
            .iter()
            .position(|t| t.threshold > xp)
            .map(|index| TierRef {
                index: Some(index),
                tier: &self.tiers[index],
            })
    }

    /// Fraction of the way from the current tier to the next, in `[0, 1]`.
    pub fn progress_fraction(&self, xp: i64) -> f64 {
        let Some(next) = self.next_tier(xp) else {
            return 1.0;
        };
        let current = self.current_tier(xp).tier.threshold;
        let span = (next.tier.threshold - current) as f64;
        if span <= 0.0 {
            return 1.0;
        }
        ((xp - current) as f64 / span).clamp(0.0, 1.0)
    }

    /// Record newly reached tiers on `global` and return their unlock events.
    ///
    /// Every tier between the previously recorded highest index and the
    /// current one is announced once, in ascending order. Lower XP never
    /// lowers the recorded index.
    pub fn evaluate_unlocks(
        &self,
        global: &mut GlobalStats,
        now: DateTime<Utc>,
    ) -> Vec<RewardEvent> {
        let Some(current) = self.tier_index(global.xp) else {
            return Vec::new();
        };
        let first_new = match global.highest_tier_unlocked {
            Some(highest) if highest >= current => return Vec::new(),
            Some(highest) => highest + 1,
            None => 0,
        };

        global.highest_tier_unlocked = Some(current);
        self.tiers[first_new..=current]
            .iter()
            .map(|tier| {
                tracing::info!(tier = %tier.name, xp = global.xp, "milestone unlocked");
                RewardEvent::milestone_unlocked(&tier.name, now)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RewardKind;

    fn evaluator() -> MilestoneEvaluator {
        MilestoneEvaluator::new(vec![
            Tier::new(100, "Bronze"),
            Tier::new(300, "Silver"),
            Tier::new(600, "Gold"),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_unsorted_tiers() {
        let result = MilestoneEvaluator::new(vec![Tier::new(300, "B"), Tier::new(100, "A")]);
        assert!(result.is_err());
        let dup = MilestoneEvaluator::new(vec![Tier::new(100, "A"), Tier::new(100, "B")]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_default_tiers_are_valid() {
        assert!(MilestoneEvaluator::new(default_tiers()).is_ok());
        assert_eq!(MilestoneEvaluator::default().tiers(), default_tiers().as_slice());
    }

    #[test]
    fn test_current_tier() {
        let e = evaluator();
        assert_eq!(e.current_tier(0).tier.name, START_TIER_NAME);
        assert_eq!(e.current_tier(0).index, None);
        assert_eq!(e.current_tier(-50).tier.name, START_TIER_NAME);
        assert_eq!(e.current_tier(99).tier.name, START_TIER_NAME);
        assert_eq!(e.current_tier(100).tier.name, "Bronze");
        assert_eq!(e.current_tier(299).tier.name, "Bronze");
        assert_eq!(e.current_tier(300).index, Some(1));
        assert_eq!(e.current_tier(10_000).tier.name, "Gold");
    }

    #[test]
    fn test_next_tier() {
        let e = evaluator();
        assert_eq!(e.next_tier(0).unwrap().tier.name, "Bronze");
        assert_eq!(e.next_tier(100).unwrap().tier.name, "Silver");
        assert_eq!(e.next_tier(599).unwrap().tier.name, "Gold");
        assert!(e.next_tier(600).is_none());
    }

    #[test]
    fn test_progress_fraction() {
        let e = evaluator();
        assert!((e.progress_fraction(50) - 0.5).abs() < 1e-9);
        assert!((e.progress_fraction(200) - 0.5).abs() < 1e-9);
        assert!((e.progress_fraction(300)).abs() < 1e-9);
        assert_eq!(e.progress_fraction(-40), 0.0);
        assert_eq!(e.progress_fraction(600), 1.0);
        assert_eq!(e.progress_fraction(5_000), 1.0);
    }

    #[test]
    fn test_progress_fraction_without_tiers() {
        let e = MilestoneEvaluator::new(Vec::new()).unwrap();
        assert_eq!(e.current_tier(10).tier.name, START_TIER_NAME);
        assert!(e.next_tier(10).is_none());
        assert_eq!(e.progress_fraction(10), 1.0);
    }

    #[test]
    fn test_unlock_emits_each_crossed_tier_once() {
        let e = evaluator();
        let mut global = GlobalStats {
            xp: 350,
            ..Default::default()
        };

        let events = e.evaluate_unlocks(&mut global, Utc::now());
        assert_eq!(events.len(), 2);
        assert!(events[0].description.contains("Bronze"));
        assert!(events[1].description.contains("Silver"));
        assert!(events.iter().all(|ev| ev.kind == RewardKind::MilestoneUnlocked));
        assert_eq!(global.highest_tier_unlocked, Some(1));

        // Replaying the same XP emits nothing.
        assert!(e.evaluate_unlocks(&mut global, Utc::now()).is_empty());
    }

    #[test]
    fn test_unlock_does_not_regress_after_penalty() {
        let e = evaluator();
        let mut global = GlobalStats {
            xp: 320,
            ..Default::default()
        };
        e.evaluate_unlocks(&mut global, Utc::now());
        assert_eq!(global.highest_tier_unlocked, Some(1));

        // A quit penalty drops XP below Silver.
        global.xp = 250;
        assert!(e.evaluate_unlocks(&mut global, Utc::now()).is_empty());
        assert_eq!(global.highest_tier_unlocked, Some(1));
        assert_eq!(e.current_tier(global.xp).tier.name, "Bronze");

        // Climbing back to Silver does not announce it again.
        global.xp = 310;
        assert!(e.evaluate_unlocks(&mut global, Utc::now()).is_empty());

        // Gold is new.
        global.xp = 700;
        let events = e.evaluate_unlocks(&mut global, Utc::now());
        assert_eq!(events.len(), 1);
        assert!(events[0].description.contains("Gold"));
    }

    #[test]
    fn test_no_unlock_below_first_tier() {
        let e = evaluator();
        let mut global = GlobalStats {
            xp: 99,
            ..Default::default()
        };
        assert!(e.evaluate_unlocks(&mut global, Utc::now()).is_empty());
        assert_eq!(global.highest_tier_unlocked, None);
    }
}
