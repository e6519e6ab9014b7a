//! Storage traits for Lexis.
//!
//! `ItemStore` owns vocabulary content (items, relations, tables);
//! `ProgressionStore` owns global progression and the append-only session
//! and reward logs. The engine never touches storage directly; the session
//! committer and CLI commands receive stores by injection.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::{GlobalStats, Relation, RewardEvent, SessionRecord, VocabTable, VocabularyItem};
use crate::error::{LexisError, Result};
use crate::stats::Stats;

/// Selection of items by table and tag.
///
/// Empty sets match everything. When both are set an item must match both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub table_ids: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl TableFilter {
    /// Match every item.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match items of a single table.
    pub fn table(table_id: impl Into<String>) -> Self {
        Self::default().with_table(table_id)
    }

    pub fn with_table(mut self, table_id: impl Into<String>) -> Self {
        self.table_ids.insert(table_id.into());
        self
    }

    /// Require at least one of the given tags.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn matches(&self, item: &VocabularyItem) -> bool {
        let table_ok = self.table_ids.is_empty() || self.table_ids.contains(&item.table_id);
        let tag_ok = self.tags.is_empty() || item.tags.iter().any(|t| self.tags.contains(t));
        table_ok && tag_ok
    }
}

/// Storage for vocabulary content.
pub trait ItemStore: Send + Sync {
    /// List items matching a filter, ordered by id.
    fn list_items(&self, filter: &TableFilter) -> Result<Vec<VocabularyItem>>;

    /// Retrieve an item by ID.
    ///
    /// Returns `Ok(None)` if the item doesn't exist.
    fn get_item(&self, id: &str) -> Result<Option<VocabularyItem>>;

    /// Upsert an item without schema validation.
    fn put_item(&self, item: &VocabularyItem) -> Result<()>;

    /// Replace an existing item's stats block.
    ///
    /// Returns `ItemNotFound` if the item doesn't exist.
    fn update_stats(&self, item_id: &str, stats: &Stats) -> Result<()>;

    /// List relations of the given tables, or every relation when
    /// `table_ids` is empty. Ordered by id.
    fn list_relations(&self, table_ids: &[String]) -> Result<Vec<Relation>>;

    fn put_relation(&self, relation: &Relation) -> Result<()>;

    fn get_table(&self, id: &str) -> Result<Option<VocabTable>>;

    fn put_table(&self, table: &VocabTable) -> Result<()>;

    /// List every table, ordered by id.
    fn list_tables(&self) -> Result<Vec<VocabTable>>;

    /// Create or replace an item after validating it against its table's
    /// schema and the keyword uniqueness rule.
    fn insert_item(&self, item: &VocabularyItem) -> Result<()> {
        let table = self
            .get_table(&item.table_id)?
            .ok_or_else(|| LexisError::table_not_found(&item.table_id))?;
        let existing = self.list_items(&TableFilter::table(&table.id))?;
        table.validate_item(item, &existing)?;
        self.put_item(item)
    }

    /// Create or replace a relation after checking it against its table:
    /// non-empty, disjoint question and answer columns, all declared.
    fn insert_relation(&self, relation: &Relation) -> Result<()> {
        let table = self
            .get_table(&relation.table_id)?
            .ok_or_else(|| LexisError::table_not_found(&relation.table_id))?;
        relation.validate(Some(&table))?;
        self.put_relation(relation)
    }
}

/// Storage for global progression and the session/reward logs.
pub trait ProgressionStore: Send + Sync {
    /// Current global stats, or defaults when nothing was stored yet.
    fn global_stats(&self) -> Result<GlobalStats>;

    fn set_global_stats(&self, stats: &GlobalStats) -> Result<()>;

    fn append_session_record(&self, record: &SessionRecord) -> Result<()>;

    fn append_reward_event(&self, event: &RewardEvent) -> Result<()>;

    /// Up to `limit` session records, most recent first.
    fn list_session_records(&self, limit: usize) -> Result<Vec<SessionRecord>>;

    /// Up to `limit` reward events, most recent first.
    fn list_reward_events(&self, limit: usize) -> Result<Vec<RewardEvent>>;

    /// The record logged for a session, searching the whole log.
    fn find_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Reward events a session logged, in append order.
    fn session_reward_events(&self, session_id: &str) -> Result<Vec<RewardEvent>>;
}

/// Blanket implementation of ItemStore for Arc-wrapped stores.
///
/// This allows sharing one store between a session committer and the
/// caller that inspects it.
impl<T: ItemStore + ?Sized> ItemStore for Arc<T> {
    fn list_items(&self, filter: &TableFilter) -> Result<Vec<VocabularyItem>> {
        (**self).list_items(filter)
    }

    fn get_item(&self, id: &str) -> Result<Option<VocabularyItem>> {
        (**self).get_item(id)
    }

    fn put_item(&self, item: &VocabularyItem) -> Result<()> {
        (**self).put_item(item)
    }

    fn update_stats(&self, item_id: &str, stats: &Stats) -> Result<()> {
        (**self).update_stats(item_id, stats)
    }

    fn list_relations(&self, table_ids: &[String]) -> Result<Vec<Relation>> {
        (**self).list_relations(table_ids)
    }

    fn put_relation(&self, relation: &Relation) -> Result<()> {
        (**self).put_relation(relation)
    }

    fn get_table(&self, id: &str) -> Result<Option<VocabTable>> {
        (**self).get_table(id)
    }

    fn put_table(&self, table: &VocabTable) -> Result<()> {
        (**self).put_table(table)
    }

    fn list_tables(&self) -> Result<Vec<VocabTable>> {
        (**self).list_tables()
    }

    fn insert_item(&self, item: &VocabularyItem) -> Result<()> {
        (**self).insert_item(item)
    }

    fn insert_relation(&self, relation: &Relation) -> Result<()> {
        (**self).insert_relation(relation)
    }
}

/// Blanket implementation of ProgressionStore for Arc-wrapped stores.
impl<T: ProgressionStore + ?Sized> ProgressionStore for Arc<T> {
    fn global_stats(&self) -> Result<GlobalStats> {
        (**self).global_stats()
    }

    fn set_global_stats(&self, stats: &GlobalStats) -> Result<()> {
        (**self).set_global_stats(stats)
    }

    fn append_session_record(&self, record: &SessionRecord) -> Result<()> {
        (**self).append_session_record(record)
    }

    fn append_reward_event(&self, event: &RewardEvent) -> Result<()> {
        (**self).append_reward_event(event)
    }

    fn list_session_records(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        (**self).list_session_records(limit)
    }

    fn list_reward_events(&self, limit: usize) -> Result<Vec<RewardEvent>> {
        (**self).list_reward_events(limit)
    }

    fn find_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        (**self).find_session_record(session_id)
    }

    fn session_reward_events(&self, session_id: &str) -> Result<Vec<RewardEvent>> {
        (**self).session_reward_events(session_id)
    }
}
