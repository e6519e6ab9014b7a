//! Relations: question/answer column mappings used to quiz a table.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::VocabTable;
use crate::error::{LexisError, Result};

/// Interaction style for a queue step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    Typing,
    MultipleChoice,
    TrueFalse,
}

impl QuizMode {
    /// All modes in declaration order.
    pub const ALL: [QuizMode; 3] = [
        QuizMode::Typing,
        QuizMode::MultipleChoice,
        QuizMode::TrueFalse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = LexisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "typing" => Ok(Self::Typing),
            "multiple_choice" | "mc" => Ok(Self::MultipleChoice),
            "true_false" | "tf" => Ok(Self::TrueFalse),
            other => Err(LexisError::validation(format!(
                "unknown quiz mode '{}'",
                other
            ))),
        }
    }
}

/// A named mapping from a table's columns into questions and answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub table_id: String,
    pub name: String,
    /// Columns shown as the question, in display order.
    pub question_columns: Vec<String>,
    /// Columns expected as the answer, in display order.
    pub answer_columns: Vec<String>,
    /// Quiz modes this relation can be practiced in.
    pub modes: BTreeSet<QuizMode>,
}

impl Relation {
    pub fn new(
        id: impl Into<String>,
        table_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            table_id: table_id.into(),
            name: name.into(),
            question_columns: Vec::new(),
            answer_columns: Vec::new(),
            modes: BTreeSet::new(),
        }
    }

    pub fn question(mut self, column: impl Into<String>) -> Self {
        self.question_columns.push(column.into());
        self
    }

    pub fn answer(mut self, column: impl Into<String>) -> Self {
        self.answer_columns.push(column.into());
        self
    }

    pub fn mode(mut self, mode: QuizMode) -> Self {
        self.modes.insert(mode);
        self
    }

    pub fn modes(mut self, modes: impl IntoIterator<Item = QuizMode>) -> Self {
        self.modes.extend(modes);
        self
    }

    /// Whether this relation supports at least one of `enabled`.
    pub fn supports_any(&self, enabled: &[QuizMode]) -> bool {
        enabled.iter().any(|m| self.modes.contains(m))
    }

    /// Sorted answer columns, used to match distractors of the same shape.
    pub fn answer_signature(&self) -> Vec<&str> {
        let mut signature: Vec<&str> = self.answer_columns.iter().map(String::as_str).collect();
        signature.sort_unstable();
        signature.dedup();
        signature
    }

    /// Non-empty, disjoint question and answer columns and at least one mode.
    pub fn is_well_formed(&self) -> bool {
        self.validate(None).is_ok()
    }

    /// Check structural invariants, optionally against the owning table.
    pub fn validate(&self, table: Option<&VocabTable>) -> Result<()> {
        if self.question_columns.is_empty() || self.answer_columns.is_empty() {
            return Err(LexisError::validation(format!(
                "relation '{}' needs at least one question and one answer column",
                self.id
            )));
        }

        if let Some(shared) = self
            .question_columns
            .iter()
            .find(|c| self.answer_columns.contains(c))
        {
            return Err(LexisError::validation(format!(
                "relation '{}' uses column '{}' as both question and answer",
                self.id, shared
            )));
        }

        if self.modes.is_empty() {
            return Err(LexisError::validation(format!(
                "relation '{}' supports no quiz mode",
                self.id
            )));
        }

        if let Some(table) = table {
            if table.id != self.table_id {
                return Err(LexisError::validation(format!(
                    "relation '{}' targets table '{}', not '{}'",
                    self.id, self.table_id, table.id
                )));
            }
            let unknown = self
                .question_columns
                .iter()
                .chain(&self.answer_columns)
                .find(|c| !table.has_column(c));
            if let Some(column) = unknown {
                return Err(LexisError::validation(format!(
                    "relation '{}' references undeclared column '{}'",
                    self.id, column
                )));
            }
        }

        Ok(())
    }
}
