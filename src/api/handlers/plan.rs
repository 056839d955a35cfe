use alloy::primitives::{Address, U256};
use axum::Json;
use axum::extract::State;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::api::types::PlanRequest;
use crate::model::BlockParams;
use crate::plan::{PlanBundle, build_plan, check_approvals};

/// Build, check and batch a plan. A newer request for the same wallet
/// cancels this one with 409.
pub async fn create_plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanBundle>, ApiError> {
    let wallet: Address = req
        .wallet
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid wallet address: {e}")))?;
    let input_amount: U256 = req
        .input_amount
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid input_amount: {e}")))?;
    let input_asset = req
        .strategy
        .input_block()
        .and_then(|b| match &b.params {
            BlockParams::Input { asset, .. } => Some(*asset),
            _ => None,
        })
        .ok_or_else(|| ApiError::BadRequest("strategy needs exactly one input block".into()))?;

    let ctx = state.plan_context(req.eth_price);
    let reader = state.inner.allowance_reader.clone();
    let timeout = state.allowance_timeout();

    let plan = state
        .inner
        .sessions
        .run(
            wallet,
            build_plan(&req.strategy, input_amount, input_asset, wallet, &ctx),
        )
        .await?;

    let approvals = if req.check_approvals {
        Some(check_approvals(&plan, wallet, reader, timeout).await?)
    } else {
        None
    };

    Ok(Json(PlanBundle::assemble(plan, approvals)))
}
