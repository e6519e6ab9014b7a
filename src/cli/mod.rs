//! CLI commands for Lexis.
//!
//! Each command takes its stores by injection, returns a serializable
//! output struct, and renders it as text or JSON.

pub mod plan;
pub mod progress;
pub mod rank;
pub mod rewards;

pub use plan::{PlanCommand, PlanOptions, PlanOutput};
pub use progress::{ProgressCommand, ProgressOptions, ProgressOutput};
pub use rank::{RankCommand, RankOptions, RankOutput};
pub use rewards::{RewardsCommand, RewardsOptions, RewardsOutput};
