//! Practice queue for Lexis.
//!
//! Building the queue from a study config, advancing it through the
//! pass1/pass2 ladder, turning queue steps into questions, and the separate
//! flashcard deck.

pub mod builder;
pub mod engine;
pub mod flashcard;
pub mod question;

pub use builder::{build_queue, choose_mode, choose_relation, QueueItem, StudyConfig};
pub use engine::{Advance, StudyQueue, FAIL_REINSERT_INDEX};
pub use flashcard::{next_flashcard_status, FlashcardDeck};
pub use question::{
    build_question, typed_answer_matches, Question, QuestionKind, Response, DISTRACTOR_COUNT,
};
