//! Vocabulary items and the table schemas that own them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{LexisError, Result};
use crate::stats::Stats;

/// Column name that always resolves to an item's keyword.
pub const KEYWORD_COLUMN: &str = "keyword";

/// A single vocabulary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    /// Unique item identifier.
    pub id: String,
    /// The table this item belongs to.
    pub table_id: String,
    /// Primary term, unique (case-insensitive) within the table.
    pub keyword: String,
    /// User-defined column values, keyed by column name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub stats: Stats,
}

impl VocabularyItem {
    /// Create a new item with empty attributes and default stats.
    pub fn new(
        id: impl Into<String>,
        table_id: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            table_id: table_id.into(),
            keyword: keyword.into(),
            attributes: BTreeMap::new(),
            tags: BTreeSet::new(),
            stats: Stats::default(),
        }
    }

    /// Builder: set a column value.
    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Builder: add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder: replace the stats block.
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    /// Display value of a column, with `keyword` mapped to the keyword.
    pub fn value(&self, column: &str) -> Option<&str> {
        if column == KEYWORD_COLUMN {
            Some(self.keyword.as_str())
        } else {
            self.attributes.get(column).map(String::as_str)
        }
    }

    /// Values of several columns joined by `" / "`, skipping empty ones.
    pub fn joined_values(&self, columns: &[String]) -> String {
        columns
            .iter()
            .filter_map(|c| self.value(c))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// A column declared by a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Display label; falls back to the name when empty.
    #[serde(default)]
    pub label: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// A vocabulary table and its column schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabTable {
    pub id: String,
    pub name: String,
    /// Declared attribute columns. `keyword` is implicit.
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

impl VocabTable {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Whether the table declares a column (or it is the keyword column).
    pub fn has_column(&self, name: &str) -> bool {
        name == KEYWORD_COLUMN || self.columns.iter().any(|c| c.name == name)
    }

    /// Validate an item before it is created in this table.
    ///
    /// `existing` is the table's current content; an entry with the same id
    /// is treated as the item being replaced.
    pub fn validate_item(&self, item: &VocabularyItem, existing: &[VocabularyItem]) -> Result<()> {
        if item.table_id != self.id {
            return Err(LexisError::validation(format!(
                "item '{}' belongs to table '{}', not '{}'",
                item.id, item.table_id, self.id
            )));
        }

        let keyword = item.keyword.trim();
        if keyword.is_empty() {
            return Err(LexisError::validation(format!(
                "item '{}' has an empty keyword",
                item.id
            )));
        }

        if let Some(column) = item.attributes.keys().find(|c| !self.has_column(c)) {
            return Err(LexisError::validation(format!(
                "column '{}' is not declared by table '{}'",
                column, self.id
            )));
        }

        let lowered = keyword.to_lowercase();
        let duplicate = existing.iter().any(|other| {
            other.id != item.id
                && other.table_id == self.id
                && other.keyword.trim().to_lowercase() == lowered
        });
        if duplicate {
            return Err(LexisError::validation(format!(
                "keyword '{}' already exists in table '{}'",
                keyword, self.id
            )));
        }

        Ok(())
    }
}
