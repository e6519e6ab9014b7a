//! Per-item statistics for Lexis.
//!
//! `recompute` derives rates, rank point and level from raw counters;
//! `priority` turns those statistics into a review-urgency score.

pub mod priority;
pub mod recompute;

pub use priority::{
    max_in_queue_by_table, priority_score, priority_score_at, rank_for_review, recency_factor,
    weights, ScoredItem,
};
pub use recompute::{
    level_for_rank_point, recompute_stats, FlashcardStatus, StatCounters, Stats, MAX_LEVEL,
    MIN_LEVEL,
};
