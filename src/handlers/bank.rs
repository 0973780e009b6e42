// src/handlers/bank.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::{
    error::AppError,
    loader::BankCache,
    models::{bank::Bank, question::QuestionType},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSetSummary {
    pub id: String,
    pub duration_minutes: i64,
    pub target_points: f64,
    pub question_count: usize,
}

/// What a client needs to offer session choices.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSummary {
    pub version: String,
    pub module: String,
    pub assessment: String,
    pub duration_minutes: i64,
    pub question_count: usize,
    pub counts: BTreeMap<QuestionType, usize>,
    pub templates: usize,
    pub exam_sets: Vec<ExamSetSummary>,
    pub packs: BTreeMap<String, usize>,
}

impl From<&Bank> for BankSummary {
    fn from(bank: &Bank) -> Self {
        Self {
            version: bank.version.clone(),
            module: bank.module.clone(),
            assessment: bank.assessment.clone(),
            duration_minutes: bank.duration_minutes,
            question_count: bank.bank.len(),
            counts: bank.count_by_type(),
            templates: bank.templates.len(),
            exam_sets: bank
                .exam_sets
                .iter()
                .map(|(id, set)| ExamSetSummary {
                    id: id.clone(),
                    duration_minutes: set.duration_minutes,
                    target_points: set.target_points,
                    question_count: set.question_count(),
                })
                .collect(),
            packs: bank
                .packs
                .iter()
                .map(|(name, ids)| (name.clone(), ids.len()))
                .collect(),
        }
    }
}

/// Summary of the loaded bank.
pub async fn get_bank(State(cache): State<Arc<BankCache>>) -> Result<impl IntoResponse, AppError> {
    let bank = cache.get().await?;
    Ok(Json(BankSummary::from(bank.as_ref())))
}

/// Re-reads the bank and packs from disk. The previous bank stays in place
/// when the new one fails to load.
pub async fn reload_bank(State(cache): State<Arc<BankCache>>) -> Result<impl IntoResponse, AppError> {
    let bank = cache.reload().await?;
    Ok(Json(BankSummary::from(bank.as_ref())))
}
