// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    engine::lifecycle::{ExitChoice, Navigation},
    error::AppError,
    models::session::AnswerValue,
    service::{CreateSessionRequest, ExamService},
    state::AppState,
    utils::html::sanitize_answer,
};

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: AnswerValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExitRequest {
    #[serde(default)]
    pub choice: Option<ExitChoice>,
}

/// Saved sessions, newest first.
pub async fn list_sessions(State(service): State<Arc<ExamService>>) -> Result<impl IntoResponse, AppError> {
    let sessions = service.list().await?;
    Ok(Json(sessions))
}

/// Builds a session from a plan and starts its clock.
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let now = Utc::now();
    let session = state.service.create_session(&bank, payload, now).await?;
    let view = state.service.view(&bank, &session.id, now).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_active(State(service): State<Arc<ExamService>>) -> Result<impl IntoResponse, AppError> {
    let session = service
        .active()
        .await?
        .ok_or(AppError::NotFound("No active session".to_string()))?;
    Ok(Json(session))
}

/// Session with its resolved questions. Solutions stay hidden in an
/// unsubmitted real exam.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let view = state.service.view(&bank, &id, Utc::now()).await?;
    Ok(Json(view))
}

pub async fn discard_session(
    State(service): State<Arc<ExamService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.discard(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records the answer for the current question.
pub async fn record_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let answer = sanitize_answer(payload.answer);
    let session = state.service.answer(&bank, &id, answer, Utc::now()).await?;
    Ok(Json(session))
}

pub async fn toggle_flag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let session = state.service.toggle_flag(&bank, &id, Utc::now()).await?;
    Ok(Json(session))
}

pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(navigation): Json<Navigation>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let session = state.service.navigate(&bank, &id, navigation, Utc::now()).await?;
    Ok(Json(session))
}

/// Timer tick. An expired real exam is submitted here.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let status = state.service.status(&bank, &id, Utc::now()).await?;
    Ok(Json(status))
}

pub async fn submit_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let session = state.service.submit(&bank, &id, Utc::now()).await?;
    Ok(Json(session))
}

pub async fn exit_session(
    State(service): State<Arc<ExamService>>,
    Path(id): Path<String>,
    Json(payload): Json<ExitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = service.exit(&id, payload.choice).await?;
    Ok(Json(json!({ "outcome": outcome })))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.bank.get().await?;
    let results = state.service.results(&bank, &id).await?;
    Ok(Json(results))
}
