use axum::Json;
use axum::extract::State;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::api::types::{
    OptimizeRequest, OptimizeResponse, SimulateRequest, SimulateResponse, ValidateRequest,
    ValidateResponse,
};
use crate::engine::{optimizer, simulator};
use crate::validate;

pub async fn validate_strategy(
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let report = validate::validate(&req.strategy);
    Ok(Json(ValidateResponse {
        valid: report.is_valid,
        errors: report.errors,
    }))
}

pub async fn optimize_strategy(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    let max_passes = state.inner.config.optimizer.max_passes;
    let outcome = optimizer::optimize_with(&req.strategy, &state.inner.market, max_passes);
    Ok(Json(OptimizeResponse {
        strategy: outcome.strategy,
        inserted_count: outcome.inserted_count,
        incompatibilities: outcome.incompatibilities,
    }))
}

pub async fn simulate_strategy(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    if !(req.eth_price.is_finite() && req.eth_price > 0.0) {
        return Err(ApiError::BadRequest(format!(
            "eth_price must be positive, got {}",
            req.eth_price
        )));
    }

    let market = &state.inner.market;
    let (strategy, inserted_count, incompatibilities) = if req.optimize {
        let outcome =
            optimizer::optimize_with(&req.strategy, market, state.inner.config.optimizer.max_passes);
        (outcome.strategy, outcome.inserted_count, outcome.incompatibilities)
    } else {
        (req.strategy, 0, Vec::new())
    };

    let result = simulator::simulate_strategy(&strategy, req.eth_price, market);
    Ok(Json(SimulateResponse {
        result,
        inserted_count,
        incompatibilities,
    }))
}
