mod error;
mod ingest;
mod routes;

use std::env;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use tower_http::cors::CorsLayer;

use advisor_core::engine::RebalanceEngine;
use advisor_core::idempotency::{AckTracker, IdempotencyStore};
use judge_gateway::{JudgeConfig, SharedDataset};

use routes::AppState;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("=== Advisor Backend Starting ===");

    let dataset = SharedDataset::seeded();
    let config = JudgeConfig::from_env();
    let provider = config.build_provider(dataset.clone())?;

    let state = AppState {
        engine: Arc::new(RebalanceEngine::new(provider)),
        acks: Arc::new(AckTracker::new()),
        ingested: Arc::new(IdempotencyStore::new()),
        dataset,
    };

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/ingest/upload", post(routes::ingest_upload))
        .route("/rebalance", post(routes::rebalance))
        .route("/ack", post(routes::ack))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = env::var("ADVISOR_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{}", port);
    info!("Advisor Backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
