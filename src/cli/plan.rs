//! Plan command for Lexis.
//!
//! Previews the practice queue a study session would start with: the most
//! urgent words of the selected tables, each paired with a relation, a quiz
//! mode and its question.

use std::collections::BTreeSet;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::core::QuizMode;
use crate::error::{LexisError, Result};
use crate::queue::{build_question, QueueItem, StudyConfig};
use crate::session::StudySession;
use crate::stats::rank_for_review;
use crate::storage::{ItemStore, TableFilter};

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tables to study (required).
    pub tables: Vec<String>,
    /// Restrict to items carrying one of these tags.
    pub tags: Vec<String>,
    /// Relations to use; every relation of the tables when empty.
    pub relations: Vec<String>,
    /// Enabled quiz modes; all modes when empty.
    pub modes: Vec<QuizMode>,
    /// Number of words to take, most urgent first.
    pub words: usize,
    /// Pick a random relation per step.
    pub random_relation: bool,
    /// Seed for a reproducible plan.
    pub seed: Option<u64>,
}

/// One planned queue step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    pub item_id: String,
    pub keyword: String,
    pub relation_id: String,
    pub mode: QuizMode,
    /// Question prompt shown for this step.
    pub prompt: String,
}

/// Output format for the plan command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Session id the plan was built for.
    pub session_id: String,
    /// Planned steps in queue order.
    pub steps: Vec<PlannedStep>,
    /// Selected words that no relation could quiz.
    pub dropped: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanOutput {
    /// Create a successful output.
    pub fn success(session_id: impl Into<String>, steps: Vec<PlannedStep>, dropped: usize) -> Self {
        Self {
            success: true,
            session_id: session_id.into(),
            steps,
            dropped,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: String::new(),
            steps: vec![],
            dropped: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Plan failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!(
            "Session {} ({} words):",
            self.session_id,
            self.steps.len()
        )];
        lines.push(String::new());

        for (i, step) in self.steps.iter().enumerate() {
            lines.push(format!(
                "{:>3}. [{}] {} ({}): {}",
                i + 1,
                step.mode,
                step.keyword,
                step.relation_id,
                step.prompt
            ));
        }

        if self.dropped > 0 {
            lines.push(String::new());
            lines.push(format!("{} words skipped: no matching relation", self.dropped));
        }

        lines.join("\n")
    }
}

/// The plan command implementation.
pub struct PlanCommand<S: ItemStore> {
    store: S,
    settings: SessionConfig,
}

impl<S: ItemStore> PlanCommand<S> {
    /// Create a new plan command.
    pub fn new(store: S, settings: SessionConfig) -> Self {
        Self { store, settings }
    }

    /// Run the plan command.
    pub fn run(&self, options: &PlanOptions) -> PlanOutput {
        match self.plan(options) {
            Ok(output) => output,
            Err(e) => PlanOutput::failure(e.to_string()),
        }
    }

    /// Assemble the study config a session over these options would use.
    pub fn study_config(&self, options: &PlanOptions) -> Result<StudyConfig> {
        if options.tables.is_empty() {
            return Err(LexisError::validation("select at least one table"));
        }
        for table_id in &options.tables {
            if self.store.get_table(table_id)?.is_none() {
                return Err(LexisError::table_not_found(table_id));
            }
        }

        let filter = options
            .tables
            .iter()
            .fold(TableFilter::all(), |f, t| f.with_table(t));
        let filter = options.tags.iter().fold(filter, |f, t| f.with_tag(t));
        let candidates = self.store.list_items(&filter)?;
        let items = rank_for_review(&candidates, options.words, Utc::now())
            .into_iter()
            .map(|scored| scored.item)
            .collect();

        let selected: BTreeSet<&str> = options.relations.iter().map(String::as_str).collect();
        let relations = self
            .store
            .list_relations(&options.tables)?
            .into_iter()
            .filter(|r| selected.is_empty() || selected.contains(r.id.as_str()))
            .collect();

        let modes = if options.modes.is_empty() {
            QuizMode::ALL.to_vec()
        } else {
            options.modes.clone()
        };

        let session_id = format!("plan-{}", Utc::now().format("%Y%m%dT%H%M%S"));
        Ok(StudyConfig::new(session_id)
            .with_items(items)
            .with_relations(relations)
            .with_modes(modes)
            .with_random_relation(options.random_relation))
    }

    fn plan(&self, options: &PlanOptions) -> Result<PlanOutput> {
        let config = self.study_config(options)?;
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let selected = config.items.len();
        let session = StudySession::start(config, &self.settings, &mut rng)?;
        let pool: Vec<QueueItem> = session.queue().steps().cloned().collect();
        let steps = pool
            .iter()
            .map(|step| {
                let prompt = build_question(step, session.config(), &pool, &mut rng)
                    .map(|q| q.prompt)
                    .unwrap_or_default();
                PlannedStep {
                    item_id: step.item.id.clone(),
                    keyword: step.item.keyword.clone(),
                    relation_id: step.relation_id.clone(),
                    mode: step.mode,
                    prompt,
                }
            })
            .collect::<Vec<_>>();

        Ok(PlanOutput::success(
            &session.config().session_id,
            steps,
            selected - pool.len(),
        ))
    }
}
