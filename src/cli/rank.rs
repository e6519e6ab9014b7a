//! Rank command for Lexis.
//!
//! Lists vocabulary items in review order, most urgent first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::{rank_for_review, ScoredItem};
use crate::storage::{ItemStore, TableFilter};

/// Options for the rank command.
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Restrict to these tables (all tables when empty).
    pub tables: Vec<String>,
    /// Restrict to items carrying one of these tags.
    pub tags: Vec<String>,
    /// Maximum number of items to show.
    pub limit: usize,
}

impl RankOptions {
    fn filter(&self) -> TableFilter {
        let filter = self
            .tables
            .iter()
            .fold(TableFilter::all(), |f, t| f.with_table(t));
        self.tags.iter().fold(filter, |f, t| f.with_tag(t))
    }
}

/// One ranked item for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: String,
    pub table_id: String,
    pub keyword: String,
    pub score: f64,
    pub level: u8,
    pub rank_point: i64,
    pub failure_rate: f64,
    pub quit_flag: bool,
    /// Last practice time (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_practiced_at: Option<String>,
}

impl From<&ScoredItem> for RankedItem {
    fn from(scored: &ScoredItem) -> Self {
        let stats = &scored.item.stats;
        Self {
            id: scored.item.id.clone(),
            table_id: scored.item.table_id.clone(),
            keyword: scored.item.keyword.clone(),
            score: scored.score,
            level: stats.level(),
            rank_point: stats.rank_point(),
            failure_rate: stats.failure_rate(),
            quit_flag: stats.quit_flag(),
            last_practiced_at: stats.last_practiced_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// Output format for the rank command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Ranked items, most urgent first.
    pub items: Vec<RankedItem>,
    /// Number of items returned.
    pub count: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RankOutput {
    /// Create a successful output.
    pub fn success(items: Vec<RankedItem>) -> Self {
        let count = items.len();
        Self {
            success: true,
            items,
            count,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            items: vec![],
            count: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Rank failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.items.is_empty() {
            return "No items found.".to_string();
        }

        let mut lines = vec![format!("Review order ({} items):", self.count)];
        lines.push(String::new());

        lines.push(format!(
            "{:>6}  {:<24}  {:<12}  {:>5}  {:>5}  {}",
            "SCORE", "KEYWORD", "TABLE", "LEVEL", "RANK", "LAST PRACTICED"
        ));
        lines.push("-".repeat(80));

        for item in &self.items {
            let last: String = item
                .last_practiced_at
                .as_deref()
                .map(|t| t.chars().take(10).collect())
                .unwrap_or_else(|| "never".to_string());
            let marker = if item.quit_flag { " (quit)" } else { "" };
            lines.push(format!(
                "{:>6.3}  {:<24}  {:<12}  {:>5}  {:>5}  {}{}",
                item.score, item.keyword, item.table_id, item.level, item.rank_point, last, marker
            ));
        }

        lines.join("\n")
    }
}

/// The rank command implementation.
pub struct RankCommand<S: ItemStore> {
    store: S,
}

impl<S: ItemStore> RankCommand<S> {
    /// Create a new rank command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the rank command.
    pub fn run(&self, options: &RankOptions) -> RankOutput {
        self.run_at(options, Utc::now())
    }

    /// Run the rank command against an explicit clock.
    pub fn run_at(&self, options: &RankOptions, now: DateTime<Utc>) -> RankOutput {
        match self.rank(options, now) {
            Ok(items) => RankOutput::success(items),
            Err(e) => RankOutput::failure(format!("Failed to rank items: {}", e)),
        }
    }

    fn rank(&self, options: &RankOptions, now: DateTime<Utc>) -> Result<Vec<RankedItem>> {
        let items = self.store.list_items(&options.filter())?;
        Ok(rank_for_review(&items, options.limit, now)
            .iter()
            .map(RankedItem::from)
            .collect())
    }
}
