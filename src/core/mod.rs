//! Core data model for Lexis.
//!
//! Vocabulary items and their table schemas, quiz relations, session-local
//! word progress, and the global progression records.

pub mod item;
pub mod progress;
pub mod relation;
pub mod rewards;

pub use item::{ColumnDef, VocabTable, VocabularyItem, KEYWORD_COLUMN};
pub use progress::{ProgressMap, WordProgress, WordStatus};
pub use relation::{QuizMode, Relation};
pub use rewards::{GlobalStats, RewardEvent, RewardKind, SessionOutcome, SessionRecord};
