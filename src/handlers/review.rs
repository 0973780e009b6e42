// src/handlers/review.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::{error::AppError, service::ExamService};

/// Questions due for spaced review today, most overdue first.
pub async fn get_due(State(service): State<Arc<ExamService>>) -> Result<impl IntoResponse, AppError> {
    let due = service.due(Utc::now()).await?;
    Ok(Json(due))
}
