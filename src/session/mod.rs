//! Study sessions for Lexis.
//!
//! The lifecycle wrapper a host drives answer by answer, the XP policy, and
//! the committer that writes results back through the stores.

pub mod commit;
pub mod lifecycle;
pub mod xp;

pub use commit::{CommitOutcome, CommitSummary, SessionCommitter};
pub use lifecycle::{SessionState, StagedAnswer, StudySession};
pub use xp::{quit_xp, session_xp};
