// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{bank, marks, review, session},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (bank, sessions, review, mistakes).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (bank cache + exam service).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let bank_routes = Router::new()
        .route("/", get(bank::get_bank))
        .route("/reload", post(bank::reload_bank));

    let session_routes = Router::new()
        .route("/", get(session::list_sessions).post(session::create_session))
        .route("/active", get(session::get_active))
        .route(
            "/{id}",
            get(session::get_session).delete(session::discard_session),
        )
        .route("/{id}/answer", put(session::record_answer))
        .route("/{id}/flag", post(session::toggle_flag))
        .route("/{id}/position", put(session::navigate))
        .route("/{id}/status", get(session::get_status))
        .route("/{id}/submit", post(session::submit_session))
        .route("/{id}/exit", post(session::exit_session))
        .route("/{id}/results", get(session::get_results))
        .route("/{id}/self-marks/{key}", put(marks::set_self_mark));

    let review_routes = Router::new().route("/due", get(review::get_due));

    let mistake_routes = Router::new().route("/{question_id}", put(marks::set_mistake));

    Router::new()
        .nest("/api/bank", bank_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/review", review_routes)
        .nest("/api/mistakes", mistake_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::loader::BankCache;
    use crate::models::bank::parse_bank;
    use crate::models::bank::tests::{bank_json, mcq};
    use crate::service::{ExamService, ServiceSettings};
    use crate::store::MemoryStore;

    fn test_state() -> AppState {
        let bank = parse_bank(&bank_json(vec![mcq("MCQ-1", "Demand", "p"), mcq("MCQ-2", "Supply", "q")]).to_string())
            .unwrap();
        AppState {
            bank: Arc::new(BankCache::from_bank(bank)),
            service: Arc::new(ExamService::new(Arc::new(MemoryStore::new()), ServiceSettings::default())),
            config: Config {
                database_url: "sqlite::memory:".to_string(),
                bank_path: PathBuf::new(),
                pack_paths: Vec::new(),
                drill_weights_path: None,
                history_limit: 20,
                review_session_size: 10,
                bind_addr: "127.0.0.1:0".to_string(),
                rust_log: "error".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/sessions/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_exam_type_is_rejected() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"examType": "bogus"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_full_sim_on_small_bank_is_unprocessable() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"examType": "full_sim_exam1", "seed": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
