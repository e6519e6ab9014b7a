//! Derived per-item statistics.
//!
//! `Stats` is never edited field by field. Callers adjust the raw
//! [`StatCounters`] and run them through [`recompute_stats`], which is the
//! only code path that produces rates, rank point and level. Deserialization
//! goes through the same function, so a stored record with stale derived
//! fields is corrected on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest mastery level.
pub const MIN_LEVEL: u8 = 1;

/// Highest mastery level.
pub const MAX_LEVEL: u8 = 6;

/// Self-assessed difficulty used by the flashcard sub-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlashcardStatus {
    /// Never reviewed as a flashcard.
    #[default]
    None,
    Hard,
    Good,
    Easy,
}

/// Raw inputs to [`recompute_stats`].
///
/// Lifetime counters only grow; the flag and timestamps are set by session
/// commits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatCounters {
    /// First-pass successes.
    pub passed1: u32,
    /// Mastery successes.
    pub passed2: u32,
    /// Failures.
    pub failed: u32,
    /// Completed sessions that included the item.
    pub in_queue_count: u32,
    /// Left unmastered when a session was abandoned.
    pub quit_flag: bool,
    pub last_practiced_at: Option<DateTime<Utc>>,
    pub flashcard_status: FlashcardStatus,
}

/// Full statistics block of a vocabulary item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredStats")]
pub struct Stats {
    passed1: u32,
    passed2: u32,
    failed: u32,
    total_attempts: u64,
    failure_rate: f64,
    success_rate: f64,
    rank_point: i64,
    level: u8,
    in_queue_count: u32,
    quit_flag: bool,
    last_practiced_at: Option<DateTime<Utc>>,
    flashcard_status: FlashcardStatus,
}

impl Default for Stats {
    fn default() -> Self {
        recompute_stats(&StatCounters::default())
    }
}

impl Stats {
    pub fn passed1(&self) -> u32 {
        self.passed1
    }

    pub fn passed2(&self) -> u32 {
        self.passed2
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub fn rank_point(&self) -> i64 {
        self.rank_point
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn in_queue_count(&self) -> u32 {
        self.in_queue_count
    }

    pub fn quit_flag(&self) -> bool {
        self.quit_flag
    }

    pub fn last_practiced_at(&self) -> Option<DateTime<Utc>> {
        self.last_practiced_at
    }

    pub fn flashcard_status(&self) -> FlashcardStatus {
        self.flashcard_status
    }

    /// Extract the raw counters this block was derived from.
    pub fn counters(&self) -> StatCounters {
        StatCounters {
            passed1: self.passed1,
            passed2: self.passed2,
            failed: self.failed,
            in_queue_count: self.in_queue_count,
            quit_flag: self.quit_flag,
            last_practiced_at: self.last_practiced_at,
            flashcard_status: self.flashcard_status,
        }
    }

    /// Apply a change to the counters and re-derive everything else.
    pub fn with_counters(&self, update: impl FnOnce(&mut StatCounters)) -> Stats {
        let mut counters = self.counters();
        update(&mut counters);
        recompute_stats(&counters)
    }
}

/// Recompute a full stats block from raw counters.
///
/// Pure and total: the same counters always yield the same block.
pub fn recompute_stats(counters: &StatCounters) -> Stats {
    let total_attempts =
        u64::from(counters.passed1) + u64::from(counters.passed2) + u64::from(counters.failed);
    let failure_rate = if total_attempts > 0 {
        counters.failed as f64 / total_attempts as f64
    } else {
        0.0
    };
    let rank_point =
        (counters.passed1 as i64 + counters.passed2 as i64) - counters.failed as i64;

    Stats {
        passed1: counters.passed1,
        passed2: counters.passed2,
        failed: counters.failed,
        total_attempts,
        failure_rate,
        success_rate: 1.0 - failure_rate,
        rank_point,
        level: level_for_rank_point(rank_point),
        in_queue_count: counters.in_queue_count,
        quit_flag: counters.quit_flag,
        last_practiced_at: counters.last_practiced_at,
        flashcard_status: counters.flashcard_status,
    }
}

/// Map a rank point onto the 1..=6 level ladder.
pub fn level_for_rank_point(rank_point: i64) -> u8 {
    match rank_point {
        i64::MIN..=0 => 1,
        1..=3 => 2,
        4..=7 => 3,
        8..=15 => 4,
        16..=31 => 5,
        _ => MAX_LEVEL,
    }
}

/// On-disk shape of [`Stats`]. Derived fields are accepted but ignored.
#[derive(Deserialize)]
struct StoredStats {
    #[serde(flatten)]
    counters: StatCounters,
}

impl From<StoredStats> for Stats {
    fn from(stored: StoredStats) -> Self {
        recompute_stats(&stored.counters)
    }
}
