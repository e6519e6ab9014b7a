//! Lexis - study session engine for vocabulary practice
//!
//! Lexis scores vocabulary items for review, runs an adaptive practice queue
//! across typing, multiple-choice and true/false questions, and commits
//! session results back into per-item statistics and global progression
//! (XP and milestones). Persistence sits behind injectable store traits.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod milestones;
pub mod queue;
pub mod session;
pub mod stats;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{
    GlobalStats, ProgressMap, QuizMode, Relation, RewardEvent, RewardKind, SessionOutcome,
    SessionRecord, VocabTable, VocabularyItem, WordProgress, WordStatus,
};
pub use error::{LexisError, Result};
pub use milestones::{default_tiers, MilestoneEvaluator, Tier};
pub use queue::{
    build_question, build_queue, FlashcardDeck, Question, QuestionKind, QueueItem, Response,
    StudyConfig, StudyQueue,
};
pub use session::{
    session_xp, CommitOutcome, CommitSummary, SessionCommitter, SessionState, StudySession,
};
pub use stats::{
    priority_score, priority_score_at, rank_for_review, recompute_stats, FlashcardStatus,
    StatCounters, Stats,
};
pub use storage::{
    FileItemStore, FileProgressionStore, ItemStore, MemoryItemStore, MemoryProgressionStore,
    ProgressionStore, TableFilter,
};

// CLI commands
pub use cli::{PlanCommand, ProgressCommand, RankCommand, RewardsCommand};
