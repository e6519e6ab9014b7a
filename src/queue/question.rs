//! Question construction and answer checking for each quiz mode.
//!
//! Distractors always come from the session's own word set. For multiple
//! choice, candidates are tried in order of plausibility: words quizzed
//! through a relation with the same answer columns, then other words of the
//! same table (read through the asking relation's answer columns), then
//! anything else in the session.

use std::collections::HashSet;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{QuizMode, Relation, VocabularyItem};
use crate::queue::builder::{QueueItem, StudyConfig};

/// Maximum number of wrong options in a multiple-choice question.
pub const DISTRACTOR_COUNT: usize = 3;

/// Separator between multiple column values.
pub const VALUE_SEPARATOR: &str = " / ";

/// A question ready to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub item_id: String,
    pub relation_id: String,
    /// Question-column values.
    pub prompt: String,
    pub kind: QuestionKind,
}

/// Mode-specific part of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuestionKind {
    Typing {
        expected: String,
    },
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    TrueFalse {
        /// Answer shown alongside the prompt.
        shown_answer: String,
        /// Whether the shown pairing is the genuine one.
        is_genuine: bool,
    },
}

/// A user's response to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Typed(String),
    Choice(usize),
    Verdict(bool),
}

impl Question {
    pub fn mode(&self) -> QuizMode {
        match self.kind {
            QuestionKind::Typing { .. } => QuizMode::Typing,
            QuestionKind::MultipleChoice { .. } => QuizMode::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuizMode::TrueFalse,
        }
    }

    /// Judge a response. A response for the wrong mode is incorrect.
    pub fn check(&self, response: &Response) -> bool {
        match (&self.kind, response) {
            (QuestionKind::Typing { expected }, Response::Typed(input)) => {
                typed_answer_matches(input, expected)
            }
            (QuestionKind::MultipleChoice { correct_index, .. }, Response::Choice(index)) => {
                index == correct_index
            }
            (QuestionKind::TrueFalse { is_genuine, .. }, Response::Verdict(says_true)) => {
                says_true == is_genuine
            }
            _ => false,
        }
    }
}

/// Trimmed, case-insensitive exact comparison.
pub fn typed_answer_matches(input: &str, expected: &str) -> bool {
    input.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Build the question for a queue step.
///
/// `pool` is the session's queue (any order); it supplies distractors.
/// Returns `None` if the step's relation is not part of the config.
pub fn build_question<R: Rng + ?Sized>(
    step: &QueueItem,
    config: &StudyConfig,
    pool: &[QueueItem],
    rng: &mut R,
) -> Option<Question> {
    let relation = config.relation(&step.relation_id)?;
    let item = &step.item;
    let prompt = item.joined_values(&relation.question_columns);
    let answer = item.joined_values(&relation.answer_columns);

    let kind = match step.mode {
        QuizMode::Typing => QuestionKind::Typing { expected: answer },
        QuizMode::MultipleChoice => multiple_choice(item, relation, answer, config, pool, rng),
        QuizMode::TrueFalse => true_false(item, relation, answer, pool, rng),
    };

    Some(Question {
        item_id: item.id.clone(),
        relation_id: relation.id.clone(),
        prompt,
        kind,
    })
}

fn multiple_choice<R: Rng + ?Sized>(
    item: &VocabularyItem,
    relation: &Relation,
    answer: String,
    config: &StudyConfig,
    pool: &[QueueItem],
    rng: &mut R,
) -> QuestionKind {
    let signature = relation.answer_signature();
    let others: Vec<&QueueItem> = pool.iter().filter(|s| s.item.id != item.id).collect();

    let same_shape: Vec<String> = others
        .iter()
        .filter_map(|s| {
            let other_relation = config.relation(&s.relation_id)?;
            (other_relation.answer_signature() == signature)
                .then(|| s.item.joined_values(&other_relation.answer_columns))
        })
        .collect();
    let same_table: Vec<String> = others
        .iter()
        .filter(|s| s.item.table_id == item.table_id)
        .map(|s| s.item.joined_values(&relation.answer_columns))
        .collect();
    let anything: Vec<String> = others
        .iter()
        .filter_map(|s| {
            let other_relation = config.relation(&s.relation_id)?;
            Some(s.item.joined_values(&other_relation.answer_columns))
        })
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(answer.trim().to_lowercase());
    let mut distractors: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);

    for mut tier in [same_shape, same_table, anything] {
        tier.shuffle(rng);
        for candidate in tier {
            if distractors.len() == DISTRACTOR_COUNT {
                break;
            }
            let key = candidate.trim().to_lowercase();
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            distractors.push(candidate);
        }
    }

    let mut options = distractors;
    options.push(answer.clone());
    options.shuffle(rng);
    let correct_index = options.iter().position(|o| *o == answer).unwrap_or(0);

    QuestionKind::MultipleChoice {
        options,
        correct_index,
    }
}

fn true_false<R: Rng + ?Sized>(
    item: &VocabularyItem,
    relation: &Relation,
    answer: String,
    pool: &[QueueItem],
    rng: &mut R,
) -> QuestionKind {
    let genuine = QuestionKind::TrueFalse {
        shown_answer: answer.clone(),
        is_genuine: true,
    };
    if rng.random_bool(0.5) {
        return genuine;
    }

    let Some(column) = relation.answer_columns.choose(rng) else {
        return genuine;
    };
    let own = item.value(column).unwrap_or_default().trim().to_lowercase();
    let candidates: Vec<&str> = pool
        .iter()
        .filter(|s| s.item.id != item.id)
        .filter_map(|s| s.item.value(column))
        .filter(|v| {
            let v = v.trim();
            !v.is_empty() && v.to_lowercase() != own
        })
        .collect();

    let Some(swapped) = candidates.choose(rng) else {
        return genuine;
    };

    let shown_answer = relation
        .answer_columns
        .iter()
        .filter_map(|c| {
            if c == column {
                Some(swapped.trim())
            } else {
                item.value(c).map(str::trim)
            }
        })
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(VALUE_SEPARATOR);

    QuestionKind::TrueFalse {
        shown_answer,
        is_genuine: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, keyword: &str, meaning: &str) -> VocabularyItem {
        VocabularyItem::new(id, "de", keyword).with_attribute("meaning", meaning)
    }

    fn relation(modes: &[QuizMode]) -> Relation {
        Relation::new("r", "de", "word to meaning")
            .question("keyword")
            .answer("meaning")
            .modes(modes.iter().copied())
    }

    fn setup(mode: QuizMode, items: Vec<VocabularyItem>) -> (StudyConfig, Vec<QueueItem>) {
        let config = StudyConfig::new("s")
            .with_items(items.clone())
            .with_relations(vec![relation(&[mode])])
            .with_modes(vec![mode]);
        let pool = items
            .into_iter()
            .map(|item| QueueItem {
                item,
                relation_id: "r".to_string(),
                mode,
            })
            .collect();
        (config, pool)
    }

    fn vocabulary() -> Vec<VocabularyItem> {
        vec![
            item("1", "Haus", "house"),
            item("2", "Hund", "dog"),
            item("3", "Katze", "cat"),
            item("4", "Baum", "tree"),
            item("5", "Auto", "car"),
        ]
    }

    #[test]
    fn test_typed_answer_matches() {
        assert!(typed_answer_matches("  House ", "house"));
        assert!(typed_answer_matches("HOUSE / home", "house / home"));
        assert!(!typed_answer_matches("houses", "house"));
        assert!(!typed_answer_matches("", "house"));
    }

    #[test]
    fn test_typing_question() {
        let (config, pool) = setup(QuizMode::Typing, vocabulary());
        let mut rng = StdRng::seed_from_u64(1);
        let question = build_question(&pool[0], &config, &pool, &mut rng).unwrap();

        assert_eq!(question.prompt, "Haus");
        assert_eq!(question.mode(), QuizMode::Typing);
        assert!(question.check(&Response::Typed("house".to_string())));
        assert!(!question.check(&Response::Typed("dog".to_string())));
        assert!(!question.check(&Response::Choice(0)));
    }

    #[test]
    fn test_typing_joins_multiple_answer_columns() {
        let item = item("1", "Haus", "house").with_attribute("plural", "Häuser");
        let relation = Relation::new("r", "de", "r")
            .question("keyword")
            .answer("meaning")
            .answer("plural")
            .mode(QuizMode::Typing);
        let config = StudyConfig::new("s")
            .with_relations(vec![relation])
            .with_modes(vec![QuizMode::Typing]);
        let step = QueueItem {
            item,
            relation_id: "r".to_string(),
            mode: QuizMode::Typing,
        };

        let question =
            build_question(&step, &config, &[], &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(question.check(&Response::Typed("house / häuser".to_string())));
    }

    #[test]
    fn test_unknown_relation_yields_none() {
        let (config, mut pool) = setup(QuizMode::Typing, vocabulary());
        pool[0].relation_id = "missing".to_string();
        assert!(build_question(&pool[0], &config, &pool, &mut StdRng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_multiple_choice_has_four_distinct_options() {
        let (config, pool) = setup(QuizMode::MultipleChoice, vocabulary());
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let question = build_question(&pool[0], &config, &pool, &mut rng).unwrap();
            let QuestionKind::MultipleChoice {
                options,
                correct_index,
            } = &question.kind
            else {
                panic!("expected multiple choice");
            };

            assert_eq!(options.len(), 4);
            assert_eq!(options[*correct_index], "house");
            let unique: HashSet<&String> = options.iter().collect();
            assert_eq!(unique.len(), 4);
            assert!(question.check(&Response::Choice(*correct_index)));
            assert!(!question.check(&Response::Choice((*correct_index + 1) % 4)));
        }
    }

    #[test]
    fn test_multiple_choice_with_few_words() {
        let (config, pool) = setup(
            QuizMode::MultipleChoice,
            vec![item("1", "Haus", "house"), item("2", "Hund", "dog")],
        );
        let question =
            build_question(&pool[0], &config, &pool, &mut StdRng::seed_from_u64(3)).unwrap();
        let QuestionKind::MultipleChoice { options, .. } = question.kind else {
            panic!("expected multiple choice");
        };
        assert_eq!(options.len(), 2);
        assert!(options.contains(&"dog".to_string()));
    }

    #[test]
    fn test_multiple_choice_skips_duplicate_answers() {
        let (config, pool) = setup(
            QuizMode::MultipleChoice,
            vec![
                item("1", "Haus", "house"),
                item("2", "Heim", "House"),
                item("3", "Hund", "dog"),
            ],
        );
        let question =
            build_question(&pool[0], &config, &pool, &mut StdRng::seed_from_u64(5)).unwrap();
        let QuestionKind::MultipleChoice { options, .. } = question.kind else {
            panic!("expected multiple choice");
        };
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_multiple_choice_prefers_same_answer_signature() {
        // Four words quizzed for their meaning, three for their gender.
        let mut items = vocabulary();
        items.truncate(4);
        let genders: Vec<VocabularyItem> = ["der", "die", "das"]
            .iter()
            .enumerate()
            .map(|(i, g)| {
                VocabularyItem::new(format!("g{}", i), "de", format!("G{}", i))
                    .with_attribute("gender", *g)
            })
            .collect();

        let meaning = relation(&[QuizMode::MultipleChoice]);
        let gender = Relation::new("g", "de", "gender")
            .question("keyword")
            .answer("gender")
            .mode(QuizMode::MultipleChoice);
        let config = StudyConfig::new("s")
            .with_relations(vec![meaning, gender])
            .with_modes(vec![QuizMode::MultipleChoice]);

        let mut pool: Vec<QueueItem> = items
            .into_iter()
            .map(|item| QueueItem {
                item,
                relation_id: "r".to_string(),
                mode: QuizMode::MultipleChoice,
            })
            .collect();
        pool.extend(genders.into_iter().map(|item| QueueItem {
            item,
            relation_id: "g".to_string(),
            mode: QuizMode::MultipleChoice,
        }));

        for seed in 0..10 {
            let question =
                build_question(&pool[0], &config, &pool, &mut StdRng::seed_from_u64(seed))
                    .unwrap();
            let QuestionKind::MultipleChoice { options, .. } = question.kind else {
                panic!("expected multiple choice");
            };
            let mut sorted = options.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["cat", "dog", "house", "tree"]);
        }
    }

    #[test]
    fn test_true_false_statements() {
        let (config, pool) = setup(QuizMode::TrueFalse, vocabulary());
        let mut genuine = 0;
        let mut swapped = 0;

        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let question = build_question(&pool[0], &config, &pool, &mut rng).unwrap();
            let QuestionKind::TrueFalse {
                shown_answer,
                is_genuine,
            } = &question.kind
            else {
                panic!("expected true/false");
            };

            if *is_genuine {
                genuine += 1;
                assert_eq!(shown_answer, "house");
                assert!(question.check(&Response::Verdict(true)));
            } else {
                swapped += 1;
                assert_ne!(shown_answer, "house");
                assert!(["dog", "cat", "tree", "car"].contains(&shown_answer.as_str()));
                assert!(question.check(&Response::Verdict(false)));
                assert!(!question.check(&Response::Verdict(true)));
            }
        }

        assert!(genuine > 0);
        assert!(swapped > 0);
    }

    #[test]
    fn test_true_false_without_distractor_is_genuine() {
        let (config, pool) = setup(QuizMode::TrueFalse, vec![item("1", "Haus", "house")]);
        for seed in 0..10 {
            let question =
                build_question(&pool[0], &config, &pool, &mut StdRng::seed_from_u64(seed))
                    .unwrap();
            assert!(matches!(
                question.kind,
                QuestionKind::TrueFalse {
                    is_genuine: true,
                    ..
                }
            ));
        }
    }
}
