//! XP policy.

use crate::config::XpConfig;
use crate::core::ProgressMap;

/// XP earned by a completed session.
///
/// Every promotion into pass1 earns `per_promotion`; every mastered word
/// earns `per_mastered_word` on top.
pub fn session_xp(progress: &ProgressMap, policy: &XpConfig) -> i64 {
    progress
        .values()
        .map(|p| {
            let mastery = if p.status.is_terminal() {
                policy.per_mastered_word
            } else {
                0
            };
            p.session_passes as i64 * policy.per_promotion + mastery
        })
        .sum()
}

/// XP delta applied when a session is abandoned.
pub fn quit_xp(policy: &XpConfig) -> i64 {
    -policy.quit_penalty.abs()
}
