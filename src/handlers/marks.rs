// src/handlers/marks.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    error::AppError,
    models::mistake::MistakeReason,
    service::ExamService,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SelfMarkRequest {
    #[validate(range(min = 0.0, message = "Points cannot be negative"))]
    pub points: f64,
}

/// Blank or missing `reason` clears the entry.
#[derive(Debug, Deserialize, Validate)]
pub struct MistakeRequest {
    #[validate(length(max = 64, message = "Reason is too long"))]
    #[serde(default)]
    pub reason: Option<String>,
}

impl MistakeRequest {
    fn parse(&self) -> Result<Option<MistakeReason>, AppError> {
        match self.reason.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_value(Value::String(raw.to_string()))
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("Unknown mistake reason: {}", raw))),
        }
    }
}

/// Awards points to a written answer. The upper bound is the question's own
/// point value.
pub async fn set_self_mark(
    State(state): State<AppState>,
    Path((session_id, key)): Path<(String, String)>,
    Json(payload): Json<SelfMarkRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let bank = state.bank.get().await?;
    state
        .service
        .set_self_mark(&bank, &session_id, &key, payload.points)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_mistake(
    State(service): State<Arc<ExamService>>,
    Path(question_id): Path<String>,
    Json(payload): Json<MistakeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let reason = payload.parse()?;
    service.set_mistake(&question_id, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}
