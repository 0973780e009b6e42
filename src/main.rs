// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use exam_engine::config::Config;
use exam_engine::engine::drill::DrillWeighting;
use exam_engine::loader::{BankCache, load_drill_weighting};
use exam_engine::routes;
use exam_engine::service::{ExamService, ServiceSettings};
use exam_engine::state::AppState;
use exam_engine::store::SqliteStore;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let (config, config_warnings) = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let pool = match SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Migrations applied successfully.");

    // The bank is required; serving without one makes no sense.
    let bank = Arc::new(BankCache::new(&config.bank_path, config.pack_paths.clone()));
    if let Err(e) = bank.get().await {
        tracing::error!("Failed to load exam bank {}: {}", config.bank_path.display(), e);
        std::process::exit(1);
    }

    let drill_weighting = match &config.drill_weights_path {
        Some(path) => load_drill_weighting(path).await.unwrap_or_else(|e| {
            tracing::warn!("Using default drill weights, {} unreadable: {}", path.display(), e);
            DrillWeighting::default()
        }),
        None => DrillWeighting::default(),
    };

    let service = ExamService::new(
        Arc::new(SqliteStore::new(pool)),
        ServiceSettings {
            history_limit: config.history_limit,
            review_session_size: config.review_session_size,
            drill_weighting,
        },
    );

    // Create AppState
    let state = AppState {
        bank,
        service: Arc::new(service),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
