//! Study session lifecycle.
//!
//! A `StudySession` owns one queue from start to commit. Answers are staged
//! first and applied on `advance`, so the host can show feedback in between;
//! an abandon in that window discards the staged answer. Hosts poll
//! `is_idle` and call `abandon` themselves when a session goes quiet.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{SessionConfig, XpConfig};
use crate::core::ProgressMap;
use crate::error::{LexisError, Result};
use crate::queue::{build_question, Advance, QueueItem, Question, Response, StudyConfig, StudyQueue};
use crate::session::commit::{CommitOutcome, SessionCommitter};
use crate::session::xp::{quit_xp, session_xp};
use crate::storage::{ItemStore, ProgressionStore};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Completed,
    Abandoned,
}

/// An answer judged but not yet applied to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAnswer {
    pub response: Response,
    pub correct: bool,
}

/// One running study session.
#[derive(Debug, Clone)]
pub struct StudySession {
    config: StudyConfig,
    queue: StudyQueue,
    /// Initial queue, kept as the distractor pool.
    pool: Vec<QueueItem>,
    question: Option<Question>,
    staged: Option<StagedAnswer>,
    state: SessionState,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl StudySession {
    /// Build the queue and open the session.
    ///
    /// Fails with a validation error when fewer than `settings.min_words`
    /// words survive queue construction.
    pub fn start<R: Rng + ?Sized>(
        config: StudyConfig,
        settings: &SessionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let queue = StudyQueue::from_config(&config, rng);
        if queue.len() < settings.min_words {
            return Err(LexisError::validation(format!(
                "session '{}' has {} quizzable words, at least {} required",
                config.session_id,
                queue.len(),
                settings.min_words
            )));
        }

        let pool: Vec<QueueItem> = queue.steps().cloned().collect();
        let now = Utc::now();
        let mut session = Self {
            config,
            queue,
            pool,
            question: None,
            staged: None,
            state: SessionState::Active,
            started_at: now,
            last_activity_at: now,
        };
        session.refresh_question(rng);

        tracing::info!(
            session_id = %session.config.session_id,
            words = session.queue.len(),
            "session started"
        );
        Ok(session)
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn queue(&self) -> &StudyQueue {
        &self.queue
    }

    pub fn progress(&self) -> &ProgressMap {
        self.queue.progress()
    }

    /// The question for the front word.
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn staged(&self) -> Option<&StagedAnswer> {
        self.staged.as_ref()
    }

    /// All words mastered.
    pub fn is_complete(&self) -> bool {
        self.queue.is_complete()
    }

    /// XP a completion would award right now.
    pub fn earned_xp(&self, policy: &XpConfig) -> i64 {
        session_xp(self.queue.progress(), policy)
    }

    /// Judge a response to the current question and stage the result.
    ///
    /// Returns whether the response was correct.
    pub fn answer(&mut self, response: Response) -> Result<bool> {
        self.ensure_active()?;
        if self.staged.is_some() {
            return Err(LexisError::invalid_state(
                "an answer is already staged; advance first",
            ));
        }
        let question = self
            .question
            .as_ref()
            .ok_or_else(|| LexisError::invalid_state("no question to answer"))?;

        let correct = question.check(&response);
        tracing::debug!(
            session_id = %self.config.session_id,
            item_id = %question.item_id,
            correct,
            "answer staged"
        );
        self.staged = Some(StagedAnswer { response, correct });
        self.last_activity_at = Utc::now();
        Ok(correct)
    }

    /// Apply the staged answer and move to the next question.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<Advance>> {
        self.ensure_active()?;
        let staged = self
            .staged
            .take()
            .ok_or_else(|| LexisError::invalid_state("no staged answer to apply"))?;

        let advance = self.queue.advance_with(staged.correct, &self.config, rng);
        self.refresh_question(rng);
        self.last_activity_at = Utc::now();
        Ok(advance)
    }

    /// Commit the finished session.
    pub fn finish<I: ItemStore, P: ProgressionStore>(
        &mut self,
        committer: &SessionCommitter<I, P>,
        policy: &XpConfig,
    ) -> Result<CommitOutcome> {
        match self.state {
            SessionState::Abandoned => {
                return Err(LexisError::invalid_state("session was abandoned"));
            }
            SessionState::Completed => return Ok(CommitOutcome::AlreadyCommitted),
            SessionState::Active => {}
        }
        if !self.is_complete() {
            return Err(LexisError::invalid_state(format!(
                "session '{}' still has {} steps queued",
                self.config.session_id,
                self.queue.len()
            )));
        }

        let xp_delta = self.earned_xp(policy);
        let outcome = committer.commit_completion(&self.config, self.queue.progress(), xp_delta)?;
        self.state = SessionState::Completed;
        Ok(outcome)
    }

    /// Abandon the session and commit the quit.
    ///
    /// A staged answer is discarded. Calling this on a completed session
    /// writes nothing.
    pub fn abandon<I: ItemStore, P: ProgressionStore>(
        &mut self,
        committer: &SessionCommitter<I, P>,
        policy: &XpConfig,
    ) -> Result<CommitOutcome> {
        if self.state == SessionState::Completed {
            return Ok(CommitOutcome::AlreadyCommitted);
        }
        if self.staged.take().is_some() {
            tracing::debug!(session_id = %self.config.session_id, "discarding staged answer");
        }

        let outcome = committer.commit_quit(&self.config, self.queue.progress(), quit_xp(policy))?;
        self.state = SessionState::Abandoned;
        self.question = None;
        Ok(outcome)
    }

    /// Active with no activity for at least `timeout`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.state == SessionState::Active && now - self.last_activity_at >= timeout
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            state => Err(LexisError::invalid_state(format!(
                "session '{}' is {:?}",
                self.config.session_id, state
            ))),
        }
    }

    fn refresh_question<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.question = self
            .queue
            .current()
            .and_then(|step| build_question(step, &self.config, &self.pool, rng));
    }
}
