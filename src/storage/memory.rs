//! In-memory stores.
//!
//! Thread-safe implementations of `ItemStore` and `ProgressionStore` backed
//! by `RwLock`ed collections. Used by tests and by callers that keep their
//! own persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::core::{GlobalStats, Relation, RewardEvent, SessionRecord, VocabTable, VocabularyItem};
use crate::error::{LexisError, Result};
use crate::stats::Stats;
use crate::storage::{ItemStore, ProgressionStore, TableFilter};

fn poisoned<T>(_: PoisonError<T>) -> LexisError {
    LexisError::store("in-memory store lock poisoned")
}

/// In-memory vocabulary content store.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<HashMap<String, VocabularyItem>>,
    relations: RwLock<HashMap<String, Relation>>,
    tables: RwLock<HashMap<String, VocabTable>>,
}

impl MemoryItemStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of items in the store.
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemStore for MemoryItemStore {
    fn list_items(&self, filter: &TableFilter) -> Result<Vec<VocabularyItem>> {
        let items = self.items.read().map_err(poisoned)?;
        let mut result: Vec<VocabularyItem> =
            items.values().filter(|i| filter.matches(i)).cloned().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    fn get_item(&self, id: &str) -> Result<Option<VocabularyItem>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(id).cloned())
    }

    fn put_item(&self, item: &VocabularyItem) -> Result<()> {
        let mut items = self.items.write().map_err(poisoned)?;
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn update_stats(&self, item_id: &str, stats: &Stats) -> Result<()> {
        let mut items = self.items.write().map_err(poisoned)?;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| LexisError::item_not_found(item_id))?;
        item.stats = stats.clone();
        Ok(())
    }

    fn list_relations(&self, table_ids: &[String]) -> Result<Vec<Relation>> {
        let relations = self.relations.read().map_err(poisoned)?;
        let mut result: Vec<Relation> = relations
            .values()
            .filter(|r| table_ids.is_empty() || table_ids.contains(&r.table_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    fn put_relation(&self, relation: &Relation) -> Result<()> {
        let mut relations = self.relations.write().map_err(poisoned)?;
        relations.insert(relation.id.clone(), relation.clone());
        Ok(())
    }

    fn get_table(&self, id: &str) -> Result<Option<VocabTable>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(id).cloned())
    }

    fn put_table(&self, table: &VocabTable) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.insert(table.id.clone(), table.clone());
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<VocabTable>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut result: Vec<VocabTable> = tables.values().cloned().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }
}

/// In-memory progression store.
#[derive(Debug, Default)]
pub struct MemoryProgressionStore {
    global: RwLock<GlobalStats>,
    /// Session records in append order.
    sessions: RwLock<Vec<SessionRecord>>,
    /// Reward events in append order.
    rewards: RwLock<Vec<RewardEvent>>,
}

impl MemoryProgressionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressionStore for MemoryProgressionStore {
    fn global_stats(&self) -> Result<GlobalStats> {
        Ok(self.global.read().map_err(poisoned)?.clone())
    }

    fn set_global_stats(&self, stats: &GlobalStats) -> Result<()> {
        *self.global.write().map_err(poisoned)? = stats.clone();
        Ok(())
    }

    fn append_session_record(&self, record: &SessionRecord) -> Result<()> {
        self.sessions.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }

    fn append_reward_event(&self, event: &RewardEvent) -> Result<()> {
        self.rewards.write().map_err(poisoned)?.push(event.clone());
        Ok(())
    }

    fn list_session_records(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.iter().rev().take(limit).cloned().collect())
    }

    fn list_reward_events(&self, limit: usize) -> Result<Vec<RewardEvent>> {
        let rewards = self.rewards.read().map_err(poisoned)?;
        Ok(rewards.iter().rev().take(limit).cloned().collect())
    }

    fn find_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .iter()
            .rev()
            .find(|r| r.session_id == session_id)
            .cloned())
    }

    fn session_reward_events(&self, session_id: &str) -> Result<Vec<RewardEvent>> {
        let rewards = self.rewards.read().map_err(poisoned)?;
        Ok(rewards
            .iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect())
    }
}
