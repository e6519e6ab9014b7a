//! Queue advancement: the per-word promotion/demotion state machine.
//!
//! Re-insertion policy after answering the front word:
//! - promoted to `Pass1`: back of the queue (a full lap before the retry)
//! - promoted to `Pass2`: removed, the word is mastered
//! - demoted to `Fail`: third slot, so it resurfaces soon but not at once

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{ProgressMap, WordProgress, WordStatus};
use crate::queue::builder::{build_queue, choose_mode, choose_relation, QueueItem, StudyConfig};

/// Queue index a failed word is re-inserted at.
pub const FAIL_REINSERT_INDEX: usize = 2;

/// Result of one queue step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub item_id: String,
    pub from: WordStatus,
    pub to: WordStatus,
    /// Where the word went back into the queue, if it did.
    pub requeued_at: Option<usize>,
}

/// The active practice queue of a session plus per-word progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyQueue {
    queue: VecDeque<QueueItem>,
    progress: ProgressMap,
}

impl StudyQueue {
    /// Start tracking a freshly built queue. Every word begins `Untouched`.
    pub fn new(steps: Vec<QueueItem>) -> Self {
        let progress = steps
            .iter()
            .map(|step| (step.item.id.clone(), WordProgress::default()))
            .collect();
        Self {
            queue: steps.into(),
            progress,
        }
    }

    /// Build and start a queue from a study config.
    pub fn from_config<R: Rng + ?Sized>(config: &StudyConfig, rng: &mut R) -> Self {
        Self::new(build_queue(config, rng))
    }

    /// The word to ask next.
    pub fn current(&self) -> Option<&QueueItem> {
        self.queue.front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remaining steps in order.
    pub fn steps(&self) -> impl Iterator<Item = &QueueItem> {
        self.queue.iter()
    }

    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    pub fn progress_of(&self, item_id: &str) -> Option<&WordProgress> {
        self.progress.get(item_id)
    }

    /// Number of tracked words that reached `Pass2`.
    pub fn mastered_count(&self) -> usize {
        self.progress
            .values()
            .filter(|p| p.status.is_terminal())
            .count()
    }

    /// The session is over: nothing left to ask and every word mastered.
    pub fn is_complete(&self) -> bool {
        self.queue.is_empty() && self.progress.values().all(|p| p.status.is_terminal())
    }

    /// Answer the front word, keeping its relation and mode on re-insertion.
    ///
    /// Returns `None` when the queue is empty.
    pub fn advance(&mut self, correct: bool) -> Option<Advance> {
        let step = self.queue.pop_front()?;
        Some(self.apply(step, correct))
    }

    /// Answer the front word, re-deriving its relation and mode on
    /// re-insertion when the config asks for random relations.
    pub fn advance_with<R: Rng + ?Sized>(
        &mut self,
        correct: bool,
        config: &StudyConfig,
        rng: &mut R,
    ) -> Option<Advance> {
        let mut step = self.queue.pop_front()?;
        if config.use_random_relation {
            if let Some(relation) = choose_relation(config, &step.item, rng) {
                step.mode = choose_mode(relation, &config.modes, rng);
                step.relation_id = relation.id.clone();
            }
        }
        Some(self.apply(step, correct))
    }

    fn apply(&mut self, step: QueueItem, correct: bool) -> Advance {
        let item_id = step.item.id.clone();
        let progress = self.progress.entry(item_id.clone()).or_default();
        let (from, to) = progress.record(correct);

        let requeued_at = match to {
            WordStatus::Pass2 => None,
            WordStatus::Fail => {
                let index = FAIL_REINSERT_INDEX.min(self.queue.len());
                self.queue.insert(index, step);
                Some(index)
            }
            WordStatus::Pass1 | WordStatus::Untouched => {
                self.queue.push_back(step);
                Some(self.queue.len() - 1)
            }
        };

        tracing::trace!(item_id = %item_id, ?from, ?to, ?requeued_at, "queue advanced");

        Advance {
            item_id,
            from,
            to,
            requeued_at,
        }
    }
}
