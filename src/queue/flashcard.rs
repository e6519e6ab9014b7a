//! Flashcard sub-mode.
//!
//! Independent of the main pass1/pass2 ladder: cards move along a
//! Hard/Good/Easy ladder and the active card is re-inserted by its new
//! status. `Hard` returns after two cards, `Good` after eight, `Easy` goes
//! to the back.

use std::collections::{BTreeMap, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::VocabularyItem;
use crate::stats::{FlashcardStatus, Stats};

/// Re-insertion index for a card answered wrong.
pub const HARD_REINSERT_INDEX: usize = 2;

/// Re-insertion index for a card answered right for the first time.
pub const GOOD_REINSERT_INDEX: usize = 8;

/// Next status on the flashcard ladder.
pub fn next_flashcard_status(current: FlashcardStatus, correct: bool) -> FlashcardStatus {
    match (correct, current) {
        (false, _) => FlashcardStatus::Hard,
        (true, FlashcardStatus::Good | FlashcardStatus::Easy) => FlashcardStatus::Easy,
        (true, _) => FlashcardStatus::Good,
    }
}

/// A deck of flashcards with one active card at the front.
#[derive(Debug, Clone, Default)]
pub struct FlashcardDeck {
    cards: VecDeque<VocabularyItem>,
    /// Statuses changed during this deck's lifetime.
    updated: BTreeMap<String, FlashcardStatus>,
}

impl FlashcardDeck {
    /// Create a deck in the given order.
    pub fn new(items: Vec<VocabularyItem>) -> Self {
        Self {
            cards: items.into(),
            updated: BTreeMap::new(),
        }
    }

    /// Create a shuffled deck.
    pub fn shuffled<R: Rng + ?Sized>(mut items: Vec<VocabularyItem>, rng: &mut R) -> Self {
        items.shuffle(rng);
        Self::new(items)
    }

    /// The active card.
    pub fn current(&self) -> Option<&VocabularyItem> {
        self.cards.front()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card_ids(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.id.as_str())
    }

    /// Current status of a card, including changes made in this deck.
    pub fn status_of(&self, item_id: &str) -> Option<FlashcardStatus> {
        self.updated.get(item_id).copied().or_else(|| {
            self.cards
                .iter()
                .find(|c| c.id == item_id)
                .map(|c| c.stats.flashcard_status())
        })
    }

    /// Answer the active card and move it. Returns its new status.
    pub fn answer(&mut self, correct: bool) -> Option<FlashcardStatus> {
        let card = self.cards.pop_front()?;
        let status = next_flashcard_status(card.stats.flashcard_status(), correct);
        let card = VocabularyItem {
            stats: card.stats.with_counters(|c| c.flashcard_status = status),
            ..card
        };
        self.updated.insert(card.id.clone(), status);

        match status {
            FlashcardStatus::Easy => self.cards.push_back(card),
            FlashcardStatus::Good => {
                let index = GOOD_REINSERT_INDEX.min(self.cards.len());
                self.cards.insert(index, card);
            }
            FlashcardStatus::Hard | FlashcardStatus::None => {
                let index = HARD_REINSERT_INDEX.min(self.cards.len());
                self.cards.insert(index, card);
            }
        }

        Some(status)
    }

    /// Stats blocks of every card whose status changed, ready to persist.
    pub fn changed_stats(&self) -> Vec<(String, Stats)> {
        self.cards
            .iter()
            .filter(|c| self.updated.contains_key(&c.id))
            .map(|c| (c.id.clone(), c.stats.clone()))
            .collect()
    }
}
