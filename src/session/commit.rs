//! Session commits: folding a finished or abandoned session back into item
//! stats and global progression.
//!
//! Each session commits at most once. A per-session phase guarded by a mutex
//! turns a second trigger (natural completion racing an abandon signal, or a
//! repeated quit) into a no-op. A store failure leaves the phase open so the
//! caller can retry with the same progress map; the writes themselves are
//! keyed so a retry, even from another process, never double counts:
//!
//! 1. item stats are recomputed from the config snapshot and overwritten
//! 2. the session record is appended unless the log already holds one for
//!    the session
//! 3. each reward event is appended unless the session already logged it
//! 4. global stats are written last and list every folded session, so a
//!    session found there is fully committed

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{
    GlobalStats, ProgressMap, RewardEvent, RewardKind, SessionOutcome, SessionRecord,
    VocabularyItem,
};
use crate::error::{LexisError, Result};
use crate::milestones::MilestoneEvaluator;
use crate::queue::{FlashcardDeck, StudyConfig};
use crate::stats::Stats;
use crate::storage::{ItemStore, ProgressionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitPhase {
    Completed,
    Quit,
}

/// Result of a commit request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// This call persisted the session.
    Committed(CommitSummary),
    /// The session was already committed; nothing was written.
    AlreadyCommitted,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }

    pub fn summary(&self) -> Option<&CommitSummary> {
        match self {
            CommitOutcome::Committed(summary) => Some(summary),
            CommitOutcome::AlreadyCommitted => None,
        }
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitSummary {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub items_updated: usize,
    pub xp_delta: i64,
    pub xp_total: i64,
    /// Milestones unlocked by this commit.
    pub unlocked: Vec<RewardEvent>,
}

/// What earlier attempts at a session left in the progression store.
struct Persisted {
    global: GlobalStats,
    recorded: Option<SessionOutcome>,
}

/// Persists session results through injected stores.
pub struct SessionCommitter<I, P> {
    items: I,
    progression: P,
    milestones: MilestoneEvaluator,
    /// Terminal phase per committed session. Held for the whole commit.
    phases: Mutex<HashMap<String, CommitPhase>>,
}

impl<I: ItemStore, P: ProgressionStore> SessionCommitter<I, P> {
    pub fn new(items: I, progression: P) -> Self {
        Self::with_milestones(items, progression, MilestoneEvaluator::default())
    }

    pub fn with_milestones(items: I, progression: P, milestones: MilestoneEvaluator) -> Self {
        Self {
            items,
            progression,
            milestones,
            phases: Mutex::new(HashMap::new()),
        }
    }

    pub fn items(&self) -> &I {
        &self.items
    }

    pub fn progression(&self) -> &P {
        &self.progression
    }

    pub fn milestones(&self) -> &MilestoneEvaluator {
        &self.milestones
    }

    /// Commit a completed session.
    pub fn commit_completion(
        &self,
        config: &StudyConfig,
        progress: &ProgressMap,
        xp_delta: i64,
    ) -> Result<CommitOutcome> {
        self.commit_completion_at(config, progress, xp_delta, Utc::now())
    }

    /// Commit a completed session at an explicit time.
    ///
    /// Every word in `progress` gets `passed1 += max(0, passes - 1)`,
    /// `passed2 += 1` and its fails, one more queue appearance, a fresh
    /// practice timestamp and a cleared quit flag.
    pub fn commit_completion_at(
        &self,
        config: &StudyConfig,
        progress: &ProgressMap,
        xp_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        let session_id = config.session_id.as_str();
        let mut phases = self.phases.lock().map_err(poisoned)?;
        match phases.get(session_id) {
            Some(CommitPhase::Completed) => {
                tracing::debug!(session_id, "completion already committed");
                return Ok(CommitOutcome::AlreadyCommitted);
            }
            Some(CommitPhase::Quit) => return Err(abandoned(session_id)),
            None => {}
        }

        let persisted = self.persisted(session_id)?;
        if persisted.recorded == Some(SessionOutcome::Abandoned) {
            phases.insert(session_id.to_string(), CommitPhase::Quit);
            return Err(abandoned(session_id));
        }
        if persisted.global.has_committed(session_id) {
            tracing::debug!(session_id, "completion already persisted");
            phases.insert(session_id.to_string(), CommitPhase::Completed);
            return Ok(CommitOutcome::AlreadyCommitted);
        }

        let mut updated = 0;
        let mut mastered = 0;
        let mut total_passes = 0;
        let mut total_fails = 0;
        for (item_id, word) in progress {
            total_passes += word.session_passes;
            total_fails += word.session_fails;
            let mastered_now = word.status.is_terminal();
            if mastered_now {
                mastered += 1;
            } else {
                tracing::warn!(
                    session_id,
                    item_id = %item_id,
                    status = ?word.status,
                    "completing unmastered word"
                );
            }

            let Some(item) = config.item(item_id) else {
                tracing::warn!(
                    session_id,
                    item_id = %item_id,
                    "word not in session snapshot, skipping"
                );
                continue;
            };
            let stats = item.stats.with_counters(|c| {
                if mastered_now {
                    c.passed1 = c.passed1.saturating_add(word.session_passes.saturating_sub(1));
                    c.passed2 = c.passed2.saturating_add(1);
                } else {
                    c.passed1 = c.passed1.saturating_add(word.session_passes);
                }
                c.failed = c.failed.saturating_add(word.session_fails);
                c.in_queue_count = c.in_queue_count.saturating_add(1);
                c.last_practiced_at = Some(now);
                c.quit_flag = false;
            });
            if self.write_stats(item, &stats)? {
                updated += 1;
            }
        }

        let record = SessionRecord {
            session_id: session_id.to_string(),
            outcome: SessionOutcome::Completed,
            ended_at: now,
            item_ids: progress.keys().cloned().collect(),
            words_mastered: mastered,
            total_passes,
            total_fails,
            xp_delta,
        };
        let event = RewardEvent::new(
            RewardKind::SessionComplete,
            format!("Session complete: {} words mastered", mastered),
            xp_delta,
            now,
        )
        .for_session(session_id);
        let (xp_total, unlocked) = self.write_progression(persisted, &record, &event, now)?;

        phases.insert(session_id.to_string(), CommitPhase::Completed);
        tracing::info!(session_id, items = updated, xp_delta, xp_total, "session completed");

        Ok(CommitOutcome::Committed(CommitSummary {
            session_id: session_id.to_string(),
            outcome: SessionOutcome::Completed,
            items_updated: updated,
            xp_delta,
            xp_total,
            unlocked,
        }))
    }

    /// Commit an abandoned session.
    pub fn commit_quit(
        &self,
        config: &StudyConfig,
        progress: &ProgressMap,
        xp_delta: i64,
    ) -> Result<CommitOutcome> {
        self.commit_quit_at(config, progress, xp_delta, Utc::now())
    }

    /// Commit an abandoned session at an explicit time.
    ///
    /// Every config word not mastered this session gets its quit flag set;
    /// no counter changes. Safe to call repeatedly, and a no-op after a
    /// completion.
    pub fn commit_quit_at(
        &self,
        config: &StudyConfig,
        progress: &ProgressMap,
        xp_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        let session_id = config.session_id.as_str();
        let mut phases = self.phases.lock().map_err(poisoned)?;
        match phases.get(session_id) {
            Some(CommitPhase::Quit) => {
                tracing::debug!(session_id, "quit already committed");
                return Ok(CommitOutcome::AlreadyCommitted);
            }
            Some(CommitPhase::Completed) => {
                tracing::warn!(session_id, "ignoring quit for a completed session");
                return Ok(CommitOutcome::AlreadyCommitted);
            }
            None => {}
        }

        let persisted = self.persisted(session_id)?;
        if persisted.recorded == Some(SessionOutcome::Completed) {
            tracing::warn!(session_id, "ignoring quit for a completed session");
            phases.insert(session_id.to_string(), CommitPhase::Completed);
            return Ok(CommitOutcome::AlreadyCommitted);
        }
        if persisted.global.has_committed(session_id) {
            tracing::debug!(session_id, "quit already persisted");
            phases.insert(session_id.to_string(), CommitPhase::Quit);
            return Ok(CommitOutcome::AlreadyCommitted);
        }

        let mut updated = 0;
        let mut mastered = 0;
        for item in &config.items {
            let is_mastered = progress
                .get(&item.id)
                .is_some_and(|p| p.status.is_terminal());
            if is_mastered {
                mastered += 1;
                continue;
            }
            let stats = item.stats.with_counters(|c| c.quit_flag = true);
            if self.write_stats(item, &stats)? {
                updated += 1;
            }
        }

        let record = SessionRecord {
            session_id: session_id.to_string(),
            outcome: SessionOutcome::Abandoned,
            ended_at: now,
            item_ids: config.items.iter().map(|i| i.id.clone()).collect(),
            words_mastered: mastered,
            total_passes: progress.values().map(|p| p.session_passes).sum(),
            total_fails: progress.values().map(|p| p.session_fails).sum(),
            xp_delta,
        };
        let event = RewardEvent::new(
            RewardKind::SessionQuit,
            format!("Session abandoned: {} words left unmastered", updated),
            xp_delta,
            now,
        )
        .for_session(session_id);
        let (xp_total, unlocked) = self.write_progression(persisted, &record, &event, now)?;

        phases.insert(session_id.to_string(), CommitPhase::Quit);
        tracing::info!(session_id, flagged = updated, xp_delta, xp_total, "session abandoned");

        Ok(CommitOutcome::Committed(CommitSummary {
            session_id: session_id.to_string(),
            outcome: SessionOutcome::Abandoned,
            items_updated: updated,
            xp_delta,
            xp_total,
            unlocked,
        }))
    }

    /// Persist the flashcard statuses a deck changed.
    ///
    /// Returns the number of items written. Flashcard practice touches no
    /// session counters or XP.
    pub fn commit_flashcards(&self, deck: &FlashcardDeck) -> Result<usize> {
        let mut written = 0;
        for (item_id, stats) in deck.changed_stats() {
            match self.items.update_stats(&item_id, &stats) {
                Ok(()) => written += 1,
                Err(LexisError::ItemNotFound { .. }) => {
                    tracing::warn!(item_id = %item_id, "flashcard item no longer exists, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(written, "flashcard statuses committed");
        Ok(written)
    }

    /// Overwrite one item's stats. Returns false if the item was deleted
    /// since the session started.
    fn write_stats(&self, item: &VocabularyItem, stats: &Stats) -> Result<bool> {
        match self.items.update_stats(&item.id, stats) {
            Ok(()) => Ok(true),
            Err(LexisError::ItemNotFound { .. }) => {
                tracing::warn!(item_id = %item.id, "item no longer exists, skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn persisted(&self, session_id: &str) -> Result<Persisted> {
        Ok(Persisted {
            global: self.progression.global_stats()?,
            recorded: self
                .progression
                .find_session_record(session_id)?
                .map(|r| r.outcome),
        })
    }

    /// Append the record and reward events, then fold the session into the
    /// global stats.
    ///
    /// Returns the resulting XP total and the milestones unlocked.
    fn write_progression(
        &self,
        persisted: Persisted,
        record: &SessionRecord,
        event: &RewardEvent,
        now: DateTime<Utc>,
    ) -> Result<(i64, Vec<RewardEvent>)> {
        let Persisted { mut global, recorded } = persisted;
        let session_id = record.session_id.as_str();

        global.xp += record.xp_delta;
        match record.outcome {
            SessionOutcome::Completed => global.completed_session_count += 1,
            SessionOutcome::Abandoned => global.abandoned_session_count += 1,
        }
        global.committed_sessions.insert(session_id.to_string());
        let unlocked: Vec<RewardEvent> = self
            .milestones
            .evaluate_unlocks(&mut global, now)
            .into_iter()
            .map(|unlock| unlock.for_session(session_id))
            .collect();

        // Until the global write lands, a retry starts from the same totals
        // and derives the same unlocks.
        if recorded.is_none() {
            self.progression.append_session_record(record)?;
        }
        let logged = self.progression.session_reward_events(session_id)?;
        for reward in std::iter::once(event).chain(&unlocked) {
            if logged.iter().any(|l| l.same_reward(reward)) {
                tracing::debug!(
                    session_id,
                    description = %reward.description,
                    "reward already logged"
                );
                continue;
            }
            self.progression.append_reward_event(reward)?;
        }
        self.progression.set_global_stats(&global)?;

        Ok((global.xp, unlocked))
    }
}

fn abandoned(session_id: &str) -> LexisError {
    LexisError::invalid_state(format!(
        "session '{}' was abandoned and cannot be completed",
        session_id
    ))
}

fn poisoned<T>(_: PoisonError<T>) -> LexisError {
    LexisError::invalid_state("commit guard poisoned by a panicked commit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GlobalStats, QuizMode, Relation, VocabTable, WordProgress, WordStatus};
    use crate::milestones::Tier;
    use crate::queue::StudyQueue;
    use crate::storage::{MemoryItemStore, MemoryProgressionStore, TableFilter};
    use crate::stats::FlashcardStatus;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Progression store that fails on demand.
    #[derive(Default)]
    struct FlakyProgressionStore {
        inner: MemoryProgressionStore,
        fail_records: AtomicBool,
        fail_unlocks: AtomicBool,
    }

    impl ProgressionStore for FlakyProgressionStore {
        fn global_stats(&self) -> Result<GlobalStats> {
            self.inner.global_stats()
        }

        fn set_global_stats(&self, stats: &GlobalStats) -> Result<()> {
            self.inner.set_global_stats(stats)
        }

        fn append_session_record(&self, record: &SessionRecord) -> Result<()> {
            if self.fail_records.load(Ordering::SeqCst) {
                return Err(LexisError::store("progression store unavailable"));
            }
            self.inner.append_session_record(record)
        }

        fn append_reward_event(&self, event: &RewardEvent) -> Result<()> {
            if event.kind == RewardKind::MilestoneUnlocked
                && self.fail_unlocks.load(Ordering::SeqCst)
            {
                return Err(LexisError::store("reward log unavailable"));
            }
            self.inner.append_reward_event(event)
        }

        fn list_session_records(&self, limit: usize) -> Result<Vec<SessionRecord>> {
            self.inner.list_session_records(limit)
        }

        fn list_reward_events(&self, limit: usize) -> Result<Vec<RewardEvent>> {
            self.inner.list_reward_events(limit)
        }

        fn find_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
            self.inner.find_session_record(session_id)
        }

        fn session_reward_events(&self, session_id: &str) -> Result<Vec<RewardEvent>> {
            self.inner.session_reward_events(session_id)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn words(n: usize) -> Vec<VocabularyItem> {
        (0..n)
            .map(|i| {
                VocabularyItem::new(format!("w{}", i), "de", format!("Wort{}", i))
                    .with_attribute("meaning", format!("word{}", i))
            })
            .collect()
    }

    fn seeded_items(items: &[VocabularyItem]) -> Arc<MemoryItemStore> {
        let store = Arc::new(MemoryItemStore::new());
        store.put_table(&VocabTable::new("de", "German")).unwrap();
        for item in items {
            store.put_item(item).unwrap();
        }
        store
    }

    fn config(items: Vec<VocabularyItem>) -> StudyConfig {
        StudyConfig::new("s1")
            .with_items(items)
            .with_relations(vec![Relation::new("r1", "de", "DE")
                .question("keyword")
                .answer("meaning")
                .mode(QuizMode::Typing)])
            .with_modes(vec![QuizMode::Typing])
    }

    fn straight_pass(ids: &[&str]) -> ProgressMap {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    WordProgress {
                        status: WordStatus::Pass2,
                        session_fails: 0,
                        session_passes: 1,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_completion_updates_items_and_global() {
        let items = words(2);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));

        let mut progress = straight_pass(&["w0"]);
        progress.insert(
            "w1".to_string(),
            WordProgress {
                status: WordStatus::Pass2,
                session_fails: 2,
                session_passes: 3,
            },
        );

        let outcome = committer
            .commit_completion_at(&config(items), &progress, 30, now())
            .unwrap();
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.items_updated, 2);
        assert_eq!(summary.xp_total, 30);

        let w0 = store.get_item("w0").unwrap().unwrap();
        assert_eq!(w0.stats.passed1(), 0);
        assert_eq!(w0.stats.passed2(), 1);
        assert_eq!(w0.stats.in_queue_count(), 1);
        assert_eq!(w0.stats.last_practiced_at(), Some(now()));

        let w1 = store.get_item("w1").unwrap().unwrap();
        assert_eq!(w1.stats.passed1(), 2);
        assert_eq!(w1.stats.passed2(), 1);
        assert_eq!(w1.stats.failed(), 2);
        assert_eq!(w1.stats.rank_point(), 1);

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 30);
        assert_eq!(global.completed_session_count, 1);
        assert!(global.has_committed("s1"));

        let records = progression.list_session_records(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].words_mastered, 2);
        assert_eq!(records[0].total_fails, 2);

        let events = progression.list_reward_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, RewardKind::SessionComplete);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        let first = committer
            .commit_completion_at(&config, &progress, 50, now())
            .unwrap();
        assert!(first.is_committed());

        let second = committer
            .commit_completion_at(&config, &progress, 50, now())
            .unwrap();
        assert_eq!(second, CommitOutcome::AlreadyCommitted);

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 50);
        assert_eq!(global.completed_session_count, 1);
        assert_eq!(progression.list_session_records(10).unwrap().len(), 1);
        assert_eq!(store.get_item("w0").unwrap().unwrap().stats.passed2(), 1);
    }

    #[test]
    fn test_fresh_committer_does_not_double_count() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_completion_at(&config, &progress, 50, now())
            .unwrap();
        // A restarted process replays the same commit.
        SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_completion_at(&config, &progress, 50, now())
            .unwrap();

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 50);
        assert_eq!(global.completed_session_count, 1);
        assert_eq!(progression.list_session_records(10).unwrap().len(), 1);
        assert_eq!(store.get_item("w0").unwrap().unwrap().stats.passed2(), 1);
    }

    #[test]
    fn test_store_failure_allows_retry() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(FlakyProgressionStore::default());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        progression.fail_records.store(true, Ordering::SeqCst);
        let err = committer
            .commit_completion_at(&config, &progress, 20, now())
            .unwrap_err();
        assert!(err.is_retryable());

        progression.fail_records.store(false, Ordering::SeqCst);
        let retry = committer
            .commit_completion_at(&config, &progress, 20, now())
            .unwrap();
        assert!(retry.is_committed());

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 20);
        assert_eq!(global.completed_session_count, 1);
        assert_eq!(progression.list_session_records(10).unwrap().len(), 1);
        assert_eq!(store.get_item("w0").unwrap().unwrap().stats.passed2(), 1);
    }

    fn reward_kinds<P: ProgressionStore>(progression: &P) -> Vec<RewardKind> {
        progression
            .list_reward_events(10)
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_retry_after_record_failure_logs_unlock() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(FlakyProgressionStore::default());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        progression.fail_records.store(true, Ordering::SeqCst);
        assert!(committer
            .commit_completion_at(&config, &progress, 150, now())
            .is_err());
        // Nothing folded yet
        assert_eq!(progression.global_stats().unwrap(), GlobalStats::default());

        progression.fail_records.store(false, Ordering::SeqCst);
        let retry = committer
            .commit_completion_at(&config, &progress, 150, now())
            .unwrap();
        assert_eq!(retry.summary().unwrap().unlocked.len(), 1);

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 150);
        assert_eq!(global.highest_tier_unlocked, Some(0));
        assert_eq!(
            reward_kinds(&*progression),
            vec![RewardKind::MilestoneUnlocked, RewardKind::SessionComplete]
        );
    }

    #[test]
    fn test_retry_after_event_failure_fills_missing_events() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(FlakyProgressionStore::default());
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        progression.fail_unlocks.store(true, Ordering::SeqCst);
        let first = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_completion_at(&config, &progress, 150, now());
        assert!(first.is_err());
        assert_eq!(progression.list_session_records(10).unwrap().len(), 1);
        assert_eq!(reward_kinds(&*progression), vec![RewardKind::SessionComplete]);

        // A restarted process retries the commit.
        progression.fail_unlocks.store(false, Ordering::SeqCst);
        let retry = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_completion_at(&config, &progress, 150, now())
            .unwrap();
        assert!(retry.is_committed());

        assert_eq!(progression.list_session_records(10).unwrap().len(), 1);
        assert_eq!(
            reward_kinds(&*progression),
            vec![RewardKind::MilestoneUnlocked, RewardKind::SessionComplete]
        );
        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 150);
        assert_eq!(global.completed_session_count, 1);
        assert_eq!(global.highest_tier_unlocked, Some(0));
    }

    #[test]
    fn test_replay_after_later_session_is_ignored() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let first = config(items.clone());
        let mut second = config(items);
        second.session_id = "s2".to_string();
        let progress = straight_pass(&["w0"]);

        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        committer
            .commit_completion_at(&first, &progress, 50, now())
            .unwrap();
        committer
            .commit_completion_at(&second, &progress, 30, now())
            .unwrap();

        // A restarted process replays the first session.
        let replay = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_completion_at(&first, &progress, 50, now())
            .unwrap();
        assert_eq!(replay, CommitOutcome::AlreadyCommitted);

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 80);
        assert_eq!(global.completed_session_count, 2);
        assert_eq!(progression.list_session_records(10).unwrap().len(), 2);
        assert_eq!(progression.list_reward_events(10).unwrap().len(), 2);
        assert_eq!(store.get_item("w0").unwrap().unwrap().stats.passed2(), 2);
    }

    #[test]
    fn test_persisted_quit_blocks_completion_in_new_committer() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression))
            .commit_quit_at(&config, &progress, -25, now())
            .unwrap();

        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let result = committer.commit_completion_at(&config, &progress, 10, now());
        assert!(matches!(result, Err(LexisError::InvalidState { .. })));
        assert_eq!(progression.global_stats().unwrap().xp, -25);
    }

    #[test]
    fn test_quit_flags_unmastered_words_once() {
        let items = words(3);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);

        let mut progress = straight_pass(&["w0"]);
        progress.insert(
            "w1".to_string(),
            WordProgress {
                status: WordStatus::Fail,
                session_fails: 1,
                session_passes: 0,
            },
        );

        let first = committer
            .commit_quit_at(&config, &progress, -25, now())
            .unwrap();
        assert_eq!(first.summary().unwrap().items_updated, 2);

        let second = committer
            .commit_quit_at(&config, &progress, -25, now())
            .unwrap();
        assert_eq!(second, CommitOutcome::AlreadyCommitted);

        assert!(!store.get_item("w0").unwrap().unwrap().stats.quit_flag());
        let w1 = store.get_item("w1").unwrap().unwrap();
        assert!(w1.stats.quit_flag());
        // Only the flag changes
        assert_eq!(w1.stats.failed(), 0);
        assert_eq!(w1.stats.in_queue_count(), 0);
        assert!(store.get_item("w2").unwrap().unwrap().stats.quit_flag());

        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, -25);
        assert_eq!(global.abandoned_session_count, 1);
        let events = progression.list_reward_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, RewardKind::SessionQuit);
    }

    #[test]
    fn test_quit_after_completion_is_ignored() {
        let items = words(1);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        committer
            .commit_completion_at(&config, &progress, 10, now())
            .unwrap();
        let quit = committer
            .commit_quit_at(&config, &progress, -25, now())
            .unwrap();
        assert_eq!(quit, CommitOutcome::AlreadyCommitted);
        assert_eq!(progression.global_stats().unwrap().xp, 10);
        assert_eq!(progression.global_stats().unwrap().abandoned_session_count, 0);
    }

    #[test]
    fn test_completion_after_quit_is_rejected() {
        let items = words(1);
        let committer = SessionCommitter::new(
            seeded_items(&items),
            Arc::new(MemoryProgressionStore::new()),
        );
        let config = config(items);
        let progress = straight_pass(&["w0"]);

        committer
            .commit_quit_at(&config, &progress, -25, now())
            .unwrap();
        let result = committer.commit_completion_at(&config, &progress, 10, now());
        assert!(matches!(result, Err(LexisError::InvalidState { .. })));
    }

    #[test]
    fn test_completion_unlocks_milestones() {
        let items = words(1);
        let progression = Arc::new(MemoryProgressionStore::new());
        let milestones =
            MilestoneEvaluator::new(vec![Tier::new(10, "Bronze"), Tier::new(40, "Silver")])
                .unwrap();
        let committer = SessionCommitter::with_milestones(
            seeded_items(&items),
            Arc::clone(&progression),
            milestones,
        );

        let outcome = committer
            .commit_completion_at(&config(items), &straight_pass(&["w0"]), 45, now())
            .unwrap();
        assert_eq!(outcome.summary().unwrap().unlocked.len(), 2);

        let global = progression.global_stats().unwrap();
        assert_eq!(global.highest_tier_unlocked, Some(1));
        let kinds: Vec<RewardKind> = progression
            .list_reward_events(10)
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RewardKind::MilestoneUnlocked,
                RewardKind::MilestoneUnlocked,
                RewardKind::SessionComplete
            ]
        );
    }

    #[test]
    fn test_deleted_item_is_skipped() {
        let items = words(2);
        let store = Arc::new(MemoryItemStore::new());
        store.put_item(&items[0]).unwrap();
        let committer = SessionCommitter::new(Arc::clone(&store), MemoryProgressionStore::new());

        let outcome = committer
            .commit_completion_at(&config(items), &straight_pass(&["w0", "w1"]), 0, now())
            .unwrap();
        assert_eq!(outcome.summary().unwrap().items_updated, 1);
        assert_eq!(store.list_items(&TableFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_five_word_session_end_to_end() {
        let items = words(5);
        let store = seeded_items(&items);
        let progression = Arc::new(MemoryProgressionStore::new());
        let committer = SessionCommitter::new(Arc::clone(&store), Arc::clone(&progression));
        let config = config(items);

        let mut rng = StdRng::seed_from_u64(11);
        let mut queue = StudyQueue::from_config(&config, &mut rng);
        assert_eq!(queue.len(), 5);

        // Every word is answered right twice in a row.
        while let Some(step) = queue.advance(true) {
            assert_ne!(step.to, WordStatus::Fail);
        }
        assert!(queue.is_complete());

        committer
            .commit_completion_at(&config, queue.progress(), 100, now())
            .unwrap();

        for item in store.list_items(&TableFilter::all()).unwrap() {
            assert_eq!(item.stats.passed1(), 0);
            assert_eq!(item.stats.passed2(), 1);
            assert_eq!(item.stats.failed(), 0);
            assert_eq!(item.stats.rank_point(), 1);
            assert_eq!(item.stats.in_queue_count(), 1);
            assert_eq!(item.stats.last_practiced_at(), Some(now()));
        }
        let global = progression.global_stats().unwrap();
        assert_eq!(global.xp, 100);
        assert_eq!(global.completed_session_count, 1);
        // 100 XP reaches the first default tier
        assert_eq!(global.highest_tier_unlocked, Some(0));
    }

    #[test]
    fn test_commit_flashcards() {
        let items = words(2);
        let store = seeded_items(&items);
        let committer = SessionCommitter::new(Arc::clone(&store), MemoryProgressionStore::new());

        let mut deck = FlashcardDeck::new(items);
        deck.answer(false);
        assert_eq!(committer.commit_flashcards(&deck).unwrap(), 1);
        assert_eq!(
            store.get_item("w0").unwrap().unwrap().stats.flashcard_status(),
            FlashcardStatus::Hard
        );
        assert_eq!(
            store.get_item("w1").unwrap().unwrap().stats.flashcard_status(),
            FlashcardStatus::None
        );
    }
}
