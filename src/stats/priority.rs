//! Review priority scoring for vocabulary items.
//!
//! Higher scores mean more urgent review. The score is a weighted sum of:
//! - Rank component `1 / (max(rank_point, -0.999) + 1)`: 0.2
//! - Failure rate: 0.2
//! - Level component `1 / (level + 1)`: 0.1
//! - Recency factor (days since last practice): 0.2
//! - Quit flag: 0.2
//! - Inverse normalized queue depth: 0.1
//!
//! Queue depth is normalized per table, so callers ranking across tables
//! must pass each item's own table maximum (see [`rank_for_review`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::VocabularyItem;

/// Weights of the priority components.
pub mod weights {
    pub const RANK: f64 = 0.2;
    pub const FAILURE_RATE: f64 = 0.2;
    pub const LEVEL: f64 = 0.1;
    pub const RECENCY: f64 = 0.2;
    pub const QUIT: f64 = 0.2;
    pub const QUEUE_DEPTH: f64 = 0.1;
}

/// Floor applied to the rank point before inverting it.
const RANK_POINT_FLOOR: f64 = -0.999;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Recency factor for a number of days since the last practice.
pub fn recency_factor(days_since: f64) -> f64 {
    if days_since >= 10.0 {
        1.0
    } else if days_since >= 5.0 {
        0.8
    } else if days_since >= 2.0 {
        0.5
    } else {
        0.1
    }
}

/// Priority score of an item against the wall clock.
pub fn priority_score(item: &VocabularyItem, max_in_queue_in_table: u32) -> f64 {
    priority_score_at(item, max_in_queue_in_table, Utc::now())
}

/// Priority score of an item at a given instant.
///
/// Items never practiced count from the Unix epoch, so they always get the
/// full recency factor.
pub fn priority_score_at(
    item: &VocabularyItem,
    max_in_queue_in_table: u32,
    now: DateTime<Utc>,
) -> f64 {
    let stats = &item.stats;

    let last = stats.last_practiced_at().unwrap_or(DateTime::UNIX_EPOCH);
    let days_since = (now - last).num_milliseconds() as f64 / MILLIS_PER_DAY;

    let rank_component = 1.0 / ((stats.rank_point() as f64).max(RANK_POINT_FLOOR) + 1.0);
    let level_component = 1.0 / (stats.level() as f64 + 1.0);
    let quit = if stats.quit_flag() { 1.0 } else { 0.0 };
    let normalized_queue = if max_in_queue_in_table > 0 {
        stats.in_queue_count() as f64 / max_in_queue_in_table as f64
    } else {
        0.0
    };

    weights::RANK * rank_component
        + weights::FAILURE_RATE * stats.failure_rate()
        + weights::LEVEL * level_component
        + weights::RECENCY * recency_factor(days_since)
        + weights::QUIT * quit
        + weights::QUEUE_DEPTH * (1.0 - normalized_queue)
}

/// Highest `in_queue_count` per table.
pub fn max_in_queue_by_table(items: &[VocabularyItem]) -> HashMap<String, u32> {
    let mut max: HashMap<String, u32> = HashMap::new();
    for item in items {
        let entry = max.entry(item.table_id.clone()).or_insert(0);
        *entry = (*entry).max(item.stats.in_queue_count());
    }
    max
}

/// An item with its computed priority.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: VocabularyItem,
    pub score: f64,
}

/// Rank items for review, most urgent first.
///
/// Items may come from several tables; each is normalized against its own
/// table's queue depth. Ties keep their input order.
pub fn rank_for_review(
    items: &[VocabularyItem],
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    let max_by_table = max_in_queue_by_table(items);

    let mut scored: Vec<ScoredItem> = items
        .iter()
        .map(|item| {
            let max = max_by_table.get(&item.table_id).copied().unwrap_or(0);
            ScoredItem {
                item: item.clone(),
                score: priority_score_at(item, max, now),
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    scored.truncate(limit);
    scored
}
