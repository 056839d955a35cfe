pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::EngineConfig;
use crate::market::MarketData;
use crate::plan::AbiEncoder;
use crate::plan::approvals::RpcAllowanceReader;
use crate::plan::gas::RpcGasOracle;

use state::AppState;

/// Routes over an already-built state. Split out so tests can drive the
/// router with mock oracles.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/schema", get(handlers::schema::get_schema))
        .route("/api/validate", post(handlers::strategy::validate_strategy))
        .route("/api/optimize", post(handlers::strategy::optimize_strategy))
        .route("/api/simulate", post(handlers::strategy::simulate_strategy))
        .route("/api/plan", post(handlers::plan::create_plan))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(host: &str, port: u16, market: MarketData, config: EngineConfig) -> Result<()> {
    let rpc = config.rpc_endpoints()?;
    let state = AppState::new(
        market,
        Arc::new(AbiEncoder::default()),
        Arc::new(RpcGasOracle::new(rpc.clone())),
        Arc::new(RpcAllowanceReader::new(rpc)),
        config,
    );
    let app = router(state);

    let addr = format!("{host}:{port}");
    info!(%addr, "strategy-flow API server listening");
    println!("strategy-flow API server listening on {addr}");
    println!("  Health:   GET  http://{addr}/health");
    println!("  Schema:   GET  http://{addr}/api/schema");
    println!("  Validate: POST http://{addr}/api/validate");
    println!("  Optimize: POST http://{addr}/api/optimize");
    println!("  Simulate: POST http://{addr}/api/simulate");
    println!("  Plan:     POST http://{addr}/api/plan");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    axum::serve(listener, app).await.context("running server")?;

    Ok(())
}
