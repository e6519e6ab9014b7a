//! File-based stores for Lexis.
//!
//! Content lives in `<data_dir>/items.json`, `relations.json` and
//! `tables.json`; progression in `global.json` plus the append-only
//! `sessions.log` and `rewards.log`. JSON documents are rewritten atomically
//! via temp file + rename.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::data_dir;
use crate::core::{GlobalStats, Relation, RewardEvent, SessionRecord, VocabTable, VocabularyItem};
use crate::error::{LexisError, Result};
use crate::stats::Stats;
use crate::storage::jsonl::JsonlLog;
use crate::storage::{ItemStore, ProgressionStore, TableFilter};
use crate::util::{read_to_string_limited, write_atomic};

const ITEMS_FILE: &str = "items.json";
const RELATIONS_FILE: &str = "relations.json";
const TABLES_FILE: &str = "tables.json";
const GLOBAL_FILE: &str = "global.json";
const SESSIONS_LOG: &str = "sessions.log";
const REWARDS_LOG: &str = "rewards.log";

fn default_data_dir() -> Result<PathBuf> {
    data_dir()
        .ok_or_else(|| LexisError::config("could not determine data directory (no home directory)"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| LexisError::storage(dir, e))?;
    }
    Ok(())
}

fn poisoned<T>(_: PoisonError<T>) -> LexisError {
    LexisError::store("file store lock poisoned")
}

/// Read a JSON document, or the default value when the file is missing.
fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = read_to_string_limited(path)?;
    serde_json::from_str(&content)
        .map_err(|e| LexisError::serde(format!("failed to parse {}: {}", path.display(), e)))
}

fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

/// File-based vocabulary content store.
///
/// Each document is a JSON array sorted by id. Mutations read, modify and
/// rewrite the whole document under a process-local lock.
#[derive(Debug)]
pub struct FileItemStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileItemStore {
    /// Create a store in the default data directory.
    ///
    /// Uses `~/.lexis/data/` or `$LEXIS_HOME/data/`.
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir()?)
    }

    /// Create a store in a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read_items(&self) -> Result<Vec<VocabularyItem>> {
        read_document(&self.path(ITEMS_FILE))
    }

    fn read_relations(&self) -> Result<Vec<Relation>> {
        read_document(&self.path(RELATIONS_FILE))
    }

    fn read_tables(&self) -> Result<Vec<VocabTable>> {
        read_document(&self.path(TABLES_FILE))
    }

    /// Read-modify-write one document, keeping it sorted by id.
    fn modify<T, F>(&self, file: &str, id_of: fn(&T) -> &str, update: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Result<()>,
    {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let path = self.path(file);
        let mut entries: Vec<T> = read_document(&path)?;
        update(&mut entries)?;
        entries.sort_by(|a, b| id_of(a).cmp(id_of(b)));
        write_document(&path, &entries)
    }
}

/// Replace the entry with the same id, or append it.
fn upsert<T: Clone>(entries: &mut Vec<T>, value: &T, id_of: fn(&T) -> &str) {
    let id = id_of(value);
    match entries.iter_mut().find(|e| id_of(&**e) == id) {
        Some(existing) => *existing = value.clone(),
        None => entries.push(value.clone()),
    }
}

fn item_id(item: &VocabularyItem) -> &str {
    &item.id
}

fn relation_id(relation: &Relation) -> &str {
    &relation.id
}

fn table_id(table: &VocabTable) -> &str {
    &table.id
}

impl ItemStore for FileItemStore {
    fn list_items(&self, filter: &TableFilter) -> Result<Vec<VocabularyItem>> {
        let mut items: Vec<VocabularyItem> = self
            .read_items()?
            .into_iter()
            .filter(|i| filter.matches(i))
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn get_item(&self, id: &str) -> Result<Option<VocabularyItem>> {
        Ok(self.read_items()?.into_iter().find(|i| i.id == id))
    }

    fn put_item(&self, item: &VocabularyItem) -> Result<()> {
        self.modify(ITEMS_FILE, item_id, |items: &mut Vec<VocabularyItem>| {
            upsert(items, item, item_id);
            Ok(())
        })
    }

    fn update_stats(&self, id: &str, stats: &Stats) -> Result<()> {
        self.modify(ITEMS_FILE, item_id, |items: &mut Vec<VocabularyItem>| {
            let item = items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| LexisError::item_not_found(id))?;
            item.stats = stats.clone();
            Ok(())
        })
    }

    fn list_relations(&self, table_ids: &[String]) -> Result<Vec<Relation>> {
        let mut relations: Vec<Relation> = self
            .read_relations()?
            .into_iter()
            .filter(|r| table_ids.is_empty() || table_ids.contains(&r.table_id))
            .collect();
        relations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(relations)
    }

    fn put_relation(&self, relation: &Relation) -> Result<()> {
        self.modify(RELATIONS_FILE, relation_id, |relations: &mut Vec<Relation>| {
            upsert(relations, relation, relation_id);
            Ok(())
        })
    }

    fn get_table(&self, id: &str) -> Result<Option<VocabTable>> {
        Ok(self.read_tables()?.into_iter().find(|t| t.id == id))
    }

    fn put_table(&self, table: &VocabTable) -> Result<()> {
        self.modify(TABLES_FILE, table_id, |tables: &mut Vec<VocabTable>| {
            upsert(tables, table, table_id);
            Ok(())
        })
    }

    fn list_tables(&self) -> Result<Vec<VocabTable>> {
        let mut tables = self.read_tables()?;
        tables.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tables)
    }
}

/// File-based progression store.
#[derive(Debug)]
pub struct FileProgressionStore {
    dir: PathBuf,
    sessions: JsonlLog<SessionRecord>,
    rewards: JsonlLog<RewardEvent>,
}

impl FileProgressionStore {
    /// Create a store in the default data directory.
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir()?)
    }

    /// Create a store in a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self {
            sessions: JsonlLog::new(dir.join(SESSIONS_LOG)),
            rewards: JsonlLog::new(dir.join(REWARDS_LOG)),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ProgressionStore for FileProgressionStore {
    fn global_stats(&self) -> Result<GlobalStats> {
        read_document(&self.dir.join(GLOBAL_FILE))
    }

    fn set_global_stats(&self, stats: &GlobalStats) -> Result<()> {
        write_document(&self.dir.join(GLOBAL_FILE), stats)
    }

    fn append_session_record(&self, record: &SessionRecord) -> Result<()> {
        self.sessions.append(record)
    }

    fn append_reward_event(&self, event: &RewardEvent) -> Result<()> {
        self.rewards.append(event)
    }

    fn list_session_records(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        self.sessions.read_recent(limit)
    }

    fn list_reward_events(&self, limit: usize) -> Result<Vec<RewardEvent>> {
        self.rewards.read_recent(limit)
    }

    fn find_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let mut matching = self.sessions.read_matching(|r| r.session_id == session_id)?;
        Ok(matching.pop())
    }

    fn session_reward_events(&self, session_id: &str) -> Result<Vec<RewardEvent>> {
        self.rewards.read_matching(|e| e.session_id.as_deref() == Some(session_id))
    }
}
