// src/engine/scoring.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::engine::generator::round2;
use crate::engine::resolve::ResolvedQuestion;
use crate::models::question::{Question, QuestionBody};
use crate::models::session::{AnswerValue, ExamMode};

static NUMERIC_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s£$€¥]").expect("numeric noise pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
    pub points_earned: f64,
    pub points_available: f64,
    pub is_correct: bool,
    pub is_partial: bool,
}

impl QuestionScore {
    fn zero(points: f64) -> Self {
        Self {
            points_earned: 0.0,
            points_available: points,
            is_correct: false,
            is_partial: false,
        }
    }

    fn full(points: f64) -> Self {
        Self {
            points_earned: points,
            points_available: points,
            is_correct: true,
            is_partial: false,
        }
    }
}

/// Scores a single- or multi-choice question. Returns `None` for the other
/// types. An answer of the wrong shape scores as unanswered.
pub fn score_mcq_question(
    question: &Question,
    answer: Option<&AnswerValue>,
    mode: ExamMode,
) -> Option<QuestionScore> {
    let points = question.points;
    match &question.body {
        QuestionBody::McqSingle { answer_key, .. } => {
            let chosen = answer.and_then(AnswerValue::as_text);
            Some(if chosen == Some(answer_key.as_str()) {
                QuestionScore::full(points)
            } else {
                QuestionScore::zero(points)
            })
        }
        QuestionBody::McqMulti { correct_answers, .. } => {
            let selected: BTreeSet<&str> = answer
                .and_then(AnswerValue::as_choices)
                .map(|keys| keys.iter().map(String::as_str).collect())
                .unwrap_or_default();
            let correct: BTreeSet<&str> = correct_answers.iter().map(String::as_str).collect();
            Some(score_multi(&selected, &correct, points, mode))
        }
        _ => None,
    }
}

fn score_multi(selected: &BTreeSet<&str>, correct: &BTreeSet<&str>, points: f64, mode: ExamMode) -> QuestionScore {
    match mode {
        ExamMode::RealExam => {
            if selected == correct {
                QuestionScore::full(points)
            } else {
                QuestionScore::zero(points)
            }
        }
        ExamMode::Practice => {
            if selected.is_empty() || correct.is_empty() || !selected.is_subset(correct) {
                return QuestionScore::zero(points);
            }
            let fraction = selected.len() as f64 / correct.len() as f64;
            let earned = round2(points * fraction);
            QuestionScore {
                points_earned: earned,
                points_available: points,
                is_correct: fraction >= 1.0,
                is_partial: fraction < 1.0 && earned > 0.0,
            }
        }
    }
}

/// Parses a table cell, ignoring commas, whitespace and currency symbols.
pub fn parse_numeric_input(raw: &str) -> Option<f64> {
    let cleaned = NUMERIC_NOISE.replace_all(raw, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub expected: f64,
    pub entered: Option<String>,
    pub is_correct: bool,
}

/// Per-row comparison of a calculation table. `None` for other types.
pub fn score_calculation_table(
    question: &Question,
    answer: Option<&AnswerValue>,
) -> Option<BTreeMap<String, RowResult>> {
    let QuestionBody::CalculationTable { answer_data, .. } = &question.body else {
        return None;
    };
    let rows = answer.and_then(AnswerValue::as_table);
    let results = answer_data
        .market_supply
        .iter()
        .map(|(label, expected)| {
            let entered = rows.and_then(|r| r.get(label)).cloned();
            let is_correct = entered
                .as_deref()
                .and_then(parse_numeric_input)
                .is_some_and(|v| v == *expected);
            (
                label.clone(),
                RowResult {
                    expected: *expected,
                    entered,
                    is_correct,
                },
            )
        })
        .collect();
    Some(results)
}

/// Aggregate over single- and multi-choice questions only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    pub partial: usize,
    pub points_earned: f64,
    pub points_available: f64,
}

impl ScoreSummary {
    fn add(&mut self, score: &QuestionScore) {
        self.total += 1;
        self.points_available += score.points_available;
        self.points_earned += score.points_earned;
        if score.is_correct {
            self.correct += 1;
        } else if score.is_partial {
            self.partial += 1;
        }
    }
}

pub fn score_session(
    questions: &[ResolvedQuestion],
    answers: &BTreeMap<String, AnswerValue>,
    mode: ExamMode,
) -> ScoreSummary {
    let mut summary = ScoreSummary::default();
    for resolved in questions {
        if let Some(score) = score_mcq_question(&resolved.question, answers.get(&resolved.key), mode) {
            summary.add(&score);
        }
    }
    summary.points_earned = round2(summary.points_earned);
    summary
}
