//! Practice queue construction.
//!
//! Words are shuffled, then each gets a relation and a quiz mode. When the
//! caller selected several relations and did not ask for random choice,
//! every selected relation is used at least once before the remaining words
//! fall back to random assignment.

use std::collections::VecDeque;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{QuizMode, Relation, VocabularyItem};

/// Input to a study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Identifier of the session this config starts.
    pub session_id: String,
    /// Snapshot of the words to study.
    pub items: Vec<VocabularyItem>,
    /// Relations the user selected.
    pub relations: Vec<Relation>,
    /// Enabled quiz modes.
    pub modes: Vec<QuizMode>,
    /// Pick a relation at random for every step instead of covering each
    /// selected relation.
    #[serde(default)]
    pub use_random_relation: bool,
}

impl StudyConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            items: Vec::new(),
            relations: Vec::new(),
            modes: Vec::new(),
            use_random_relation: false,
        }
    }

    pub fn with_items(mut self, items: Vec<VocabularyItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_relations(mut self, relations: Vec<Relation>) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_modes(mut self, modes: Vec<QuizMode>) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_random_relation(mut self, random: bool) -> Self {
        self.use_random_relation = random;
        self
    }

    /// Look up a selected relation by id.
    pub fn relation(&self, id: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    /// Look up a config item by id.
    pub fn item(&self, id: &str) -> Option<&VocabularyItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Whether `relation` can quiz `item` in one of the enabled modes.
    ///
    /// Malformed relations never apply.
    pub fn is_applicable(&self, relation: &Relation, item: &VocabularyItem) -> bool {
        relation.table_id == item.table_id
            && relation.supports_any(&self.modes)
            && relation.is_well_formed()
    }

    /// Relations that can quiz `item`.
    pub fn applicable_relations<'a>(&'a self, item: &VocabularyItem) -> Vec<&'a Relation> {
        self.relations
            .iter()
            .filter(|r| self.is_applicable(r, item))
            .collect()
    }
}

/// One step of the practice queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub item: VocabularyItem,
    pub relation_id: String,
    pub mode: QuizMode,
}

impl QueueItem {
    pub fn item_id(&self) -> &str {
        &self.item.id
    }
}

/// Build the ordered practice queue for a session.
///
/// Words with no applicable relation are dropped. An empty word list, or no
/// relation matching any word, yields an empty queue; rejecting sessions
/// that are too short is left to the caller.
pub fn build_queue<R: Rng + ?Sized>(config: &StudyConfig, rng: &mut R) -> Vec<QueueItem> {
    let mut words: Vec<&VocabularyItem> = config.items.iter().collect();
    words.shuffle(rng);

    let mut usable: Vec<&Relation> = Vec::with_capacity(config.relations.len());
    for relation in &config.relations {
        match relation.validate(None) {
            Ok(()) => usable.push(relation),
            Err(e) => tracing::warn!(relation_id = %relation.id, error = %e, "skipping relation"),
        }
    }

    let cover_every_relation = !config.use_random_relation && usable.len() > 1;
    let mut pending: VecDeque<&Relation> = if cover_every_relation {
        usable.into_iter().collect()
    } else {
        VecDeque::new()
    };

    let mut queue = Vec::with_capacity(words.len());
    let mut dropped = 0usize;

    for word in words {
        let position = pending.iter().position(|r| config.is_applicable(r, word));
        let assigned = position.and_then(|pos| pending.remove(pos));

        let relation = match assigned.or_else(|| choose_relation(config, word, rng)) {
            Some(relation) => relation,
            None => {
                dropped += 1;
                continue;
            }
        };

        queue.push(QueueItem {
            item: word.clone(),
            relation_id: relation.id.clone(),
            mode: choose_mode(relation, &config.modes, rng),
        });
    }

    if dropped > 0 {
        tracing::debug!(
            session_id = %config.session_id,
            dropped,
            "dropped words without an applicable relation"
        );
    }
    if !pending.is_empty() {
        tracing::debug!(
            session_id = %config.session_id,
            unused = pending.len(),
            "some selected relations matched no word"
        );
    }

    queue
}

/// Pick a relation uniformly among those applicable to `item`.
pub fn choose_relation<'a, R: Rng + ?Sized>(
    config: &'a StudyConfig,
    item: &VocabularyItem,
    rng: &mut R,
) -> Option<&'a Relation> {
    config.applicable_relations(item).choose(rng).copied()
}

/// Pick a mode uniformly among the relation's enabled modes.
///
/// If none of the relation's modes is enabled (a caller contract
/// violation), any mode the relation supports is used; a relation with no
/// modes at all falls back to typing.
pub fn choose_mode<R: Rng + ?Sized>(
    relation: &Relation,
    enabled: &[QuizMode],
    rng: &mut R,
) -> QuizMode {
    let usable: Vec<QuizMode> = relation
        .modes
        .iter()
        .copied()
        .filter(|m| enabled.contains(m))
        .collect();

    if let Some(mode) = usable.choose(rng) {
        return *mode;
    }

    tracing::warn!(
        relation_id = %relation.id,
        "relation shares no mode with the enabled set, using one of its own"
    );
    let own: Vec<QuizMode> = relation.modes.iter().copied().collect();
    own.choose(rng).copied().unwrap_or(QuizMode::Typing)
}
