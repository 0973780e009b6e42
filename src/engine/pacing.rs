// src/engine/pacing.rs

use serde::Serialize;

use crate::models::question::QuestionType;

pub const PACE_TOLERANCE_SECONDS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaceStatus {
    Ahead,
    #[serde(rename = "On pace")]
    OnPace,
    Behind,
}

/// Planned seconds per question: each section budget split across the
/// number of questions expected in it.
pub fn plan_seconds(question_type: QuestionType) -> i64 {
    match question_type {
        QuestionType::McqSingle | QuestionType::McqMulti => 15 * 60 / 10,
        QuestionType::ShortAnswer | QuestionType::CalculationTable => 20 * 60 / 5,
        QuestionType::Scenario | QuestionType::DiagramLogic => 15 * 60 / 3,
    }
}

/// Planned time for every question strictly before `current_index`.
pub fn expected_elapsed_seconds(types: &[QuestionType], current_index: usize) -> i64 {
    types
        .iter()
        .take(current_index.min(types.len()))
        .map(|t| plan_seconds(*t))
        .sum()
}

pub fn pace_status(types: &[QuestionType], current_index: usize, elapsed_seconds: i64) -> PaceStatus {
    if types.is_empty() {
        return PaceStatus::OnPace;
    }
    let delta = elapsed_seconds - expected_elapsed_seconds(types, current_index);
    if delta > PACE_TOLERANCE_SECONDS {
        PaceStatus::Behind
    } else if delta < -PACE_TOLERANCE_SECONDS {
        PaceStatus::Ahead
    } else {
        PaceStatus::OnPace
    }
}
