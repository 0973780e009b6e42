// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Separator used when the same base question appears more than once in a
/// session (weighted drills draw with replacement).
pub const DUPLICATE_SUFFIX: &str = "__";

/// Discriminant of a question, used for pool filtering and pacing budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    McqSingle,
    McqMulti,
    ShortAnswer,
    Scenario,
    DiagramLogic,
    CalculationTable,
}

impl QuestionType {
    /// Single- and multi-choice questions are marked automatically.
    pub fn is_auto_gradable(self) -> bool {
        matches!(self, QuestionType::McqSingle | QuestionType::McqMulti)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::McqSingle => "mcq_single",
            QuestionType::McqMulti => "mcq_multi",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Scenario => "scenario",
            QuestionType::DiagramLogic => "diagram_logic",
            QuestionType::CalculationTable => "calculation_table",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-marked answer material shared by every written type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenBody {
    pub mark_scheme: Vec<String>,
    pub model_answer: String,
}

/// Expected per-row values of a calculation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationAnswerData {
    /// Row label (e.g. "£5") -> expected numeric entry.
    pub market_supply: BTreeMap<String, f64>,
}

/// Type-specific part of a question. The `type` tag lives next to the shared
/// fields in the bank document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    McqSingle {
        options: BTreeMap<String, String>,
        answer_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rationale: Option<String>,
    },
    McqMulti {
        options: BTreeMap<String, String>,
        correct_answers: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rationale: Option<String>,
    },
    ShortAnswer(WrittenBody),
    Scenario(WrittenBody),
    DiagramLogic(WrittenBody),
    CalculationTable {
        answer_data: CalculationAnswerData,
        #[serde(default)]
        mark_scheme: Vec<String>,
        #[serde(default)]
        model_answer: String,
    },
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Question {
    #[validate(length(min = 1, max = 200))]
    pub id: String,

    /// Free text, used for categorisation.
    pub topic: String,

    #[validate(range(min = 0.0))]
    pub points: f64,

    /// May contain `{placeholder}` substitutions for generated variants.
    #[validate(length(min = 1))]
    pub prompt: String,

    #[serde(flatten)]
    pub body: QuestionBody,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match &self.body {
            QuestionBody::McqSingle { .. } => QuestionType::McqSingle,
            QuestionBody::McqMulti { .. } => QuestionType::McqMulti,
            QuestionBody::ShortAnswer(_) => QuestionType::ShortAnswer,
            QuestionBody::Scenario(_) => QuestionType::Scenario,
            QuestionBody::DiagramLogic(_) => QuestionType::DiagramLogic,
            QuestionBody::CalculationTable { .. } => QuestionType::CalculationTable,
        }
    }

    pub fn options(&self) -> Option<&BTreeMap<String, String>> {
        match &self.body {
            QuestionBody::McqSingle { options, .. } | QuestionBody::McqMulti { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }

    /// Mark scheme and model answer for the self-marked types.
    pub fn written(&self) -> Option<(&[String], &str)> {
        match &self.body {
            QuestionBody::ShortAnswer(w) | QuestionBody::Scenario(w) | QuestionBody::DiagramLogic(w) => {
                Some((&w.mark_scheme, &w.model_answer))
            }
            QuestionBody::CalculationTable {
                mark_scheme,
                model_answer,
                ..
            } => Some((mark_scheme, model_answer)),
            _ => None,
        }
    }

    /// Structural checks that serde cannot express. Returns the offending
    /// field name and a reason.
    pub fn check_answer_keys(&self) -> Result<(), (&'static str, String)> {
        match &self.body {
            QuestionBody::McqSingle {
                options,
                answer_key,
                ..
            } => {
                if options.is_empty() {
                    return Err(("options", "must contain at least one option".to_string()));
                }
                if !options.contains_key(answer_key) {
                    return Err((
                        "answer_key",
                        format!("`{}` is not one of the option keys", answer_key),
                    ));
                }
            }
            QuestionBody::McqMulti {
                options,
                correct_answers,
                ..
            } => {
                if options.is_empty() {
                    return Err(("options", "must contain at least one option".to_string()));
                }
                if correct_answers.is_empty() {
                    return Err(("correct_answers", "must not be empty".to_string()));
                }
                if let Some(key) = correct_answers.iter().find(|k| !options.contains_key(*k)) {
                    return Err((
                        "correct_answers",
                        format!("`{}` is not one of the option keys", key),
                    ));
                }
            }
            QuestionBody::CalculationTable { answer_data, .. } => {
                if answer_data.market_supply.is_empty() {
                    return Err(("answer_data.market_supply", "must not be empty".to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Strips the duplicate-draw suffix from a session slot id.
///
/// `"MCQ-3__2"` -> `"MCQ-3"`; ids without a numeric suffix are returned as-is.
pub fn extract_base_question_id(id: &str) -> &str {
    match id.rsplit_once(DUPLICATE_SUFFIX) {
        Some((base, n)) if !base.is_empty() && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => id,
    }
}

/// Numeric ranges for the midpoint elasticity generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuantityRanges {
    pub price_min: i64,
    pub price_max: i64,
    pub quantity_min: i64,
    pub quantity_max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    PedMidpoint,
}

/// Parametric generator definition, resolved into a concrete question per seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuestionTemplate {
    #[validate(length(min = 1, max = 200))]
    pub id: String,
    pub template: TemplateKind,
    pub topic: String,
    #[validate(range(min = 0.0))]
    pub points: f64,
    #[validate(length(min = 1))]
    pub prompt: String,
    pub ranges: PriceQuantityRanges,
}

/// Values drawn for a generated question, exposed for review screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedValues {
    pub p1: i64,
    pub p2: i64,
    pub q1: i64,
    pub q2: i64,
    pub ped: f64,
    pub interpretation: String,
}
