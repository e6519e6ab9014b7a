//! Session-local word progress and its state machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Position of a word on the in-session mastery ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
    /// Not yet answered this session.
    #[default]
    Untouched,
    /// Last answer was wrong.
    Fail,
    /// Answered correctly once since the last failure.
    Pass1,
    /// Mastered; leaves the rotation for the rest of the session.
    Pass2,
}

impl WordStatus {
    /// Status after answering from this status.
    ///
    /// `Pass2` is terminal and absorbs any further answer.
    pub fn next(self, correct: bool) -> WordStatus {
        match (self, correct) {
            (WordStatus::Pass2, _) => WordStatus::Pass2,
            (WordStatus::Pass1, true) => WordStatus::Pass2,
            (_, true) => WordStatus::Pass1,
            (_, false) => WordStatus::Fail,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WordStatus::Pass2)
    }
}

/// Per-word progress accumulated during one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WordProgress {
    pub status: WordStatus,
    /// Incorrect answers this session.
    pub session_fails: u32,
    /// Promotions into `Pass1` this session. The mastering answer is
    /// credited separately as a `passed2` at commit time.
    pub session_passes: u32,
}

impl WordProgress {
    /// Apply an answer and return the `(from, to)` transition.
    pub fn record(&mut self, correct: bool) -> (WordStatus, WordStatus) {
        let from = self.status;
        let to = from.next(correct);
        if from.is_terminal() {
            return (from, to);
        }
        if correct {
            if to == WordStatus::Pass1 {
                self.session_passes += 1;
            }
        } else {
            self.session_fails += 1;
        }
        self.status = to;
        (from, to)
    }
}

/// Progress of every word tracked by a session, keyed by item id.
pub type ProgressMap = BTreeMap<String, WordProgress>;
