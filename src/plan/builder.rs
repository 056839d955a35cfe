use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::optimizer::{self, DEFAULT_MAX_PASSES};
use crate::engine::simulator::{self, Flow, Visit};
use crate::market::MarketData;
use crate::model::{Asset, BlockParams, Strategy};
use crate::validate;

use super::encode::{CallEncoder, EncodeRequest, EncodedCall};
use super::evm::{self, IERC20};
use super::gas::{self, GasOracle};
use super::{ChainGasPrice, PlanError, Step, StepAction, TransactionPlan};

/// Default plan lifetime.
pub const DEFAULT_PLAN_TTL_SECS: i64 = 300;

/// Everything a plan build needs besides the strategy itself.
#[derive(Clone)]
pub struct PlanContext {
    pub market: Arc<MarketData>,
    pub eth_price: f64,
    pub encoder: Arc<dyn CallEncoder>,
    pub gas_oracle: Arc<dyn GasOracle>,
    pub ttl: chrono::Duration,
    pub gas_timeout: Duration,
    pub max_passes: usize,
}

impl PlanContext {
    pub fn new(
        market: Arc<MarketData>,
        eth_price: f64,
        encoder: Arc<dyn CallEncoder>,
        gas_oracle: Arc<dyn GasOracle>,
    ) -> Self {
        PlanContext {
            market,
            eth_price,
            encoder,
            gas_oracle,
            ttl: chrono::Duration::seconds(DEFAULT_PLAN_TTL_SECS),
            gas_timeout: Duration::from_secs(5),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_gas_timeout(mut self, timeout: Duration) -> Self {
        self.gas_timeout = timeout;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

/// Turn a strategy into an ordered, expiring transaction plan.
///
/// The route is optimized first; any edge left incompatible aborts the
/// build. Steps follow the simulation's execution order, loop iterations
/// unrolled, with an approve inserted before every call that pulls an
/// ERC-20.
pub async fn build_plan(
    strategy: &Strategy,
    input_amount: U256,
    input_asset: Asset,
    wallet: Address,
    ctx: &PlanContext,
) -> Result<TransactionPlan, PlanError> {
    if input_amount.is_zero() {
        return Err(PlanError::ZeroAmount);
    }

    // ── Input ──
    let mut strategy = strategy.clone();
    let input_id = {
        let input = strategy.input_block().ok_or_else(|| {
            PlanError::InvalidStrategy(validate::validate(&strategy).errors)
        })?;
        if let BlockParams::Input { asset, .. } = &input.params {
            if *asset != input_asset {
                return Err(PlanError::InputMismatch {
                    expected: *asset,
                    requested: input_asset,
                });
            }
        }
        input.id.clone()
    };
    if let Some(block) = strategy.blocks.iter_mut().find(|b| b.id == input_id) {
        if let BlockParams::Input { amount, .. } = &mut block.params {
            *amount = evm::from_token_units(input_amount, input_asset.decimals());
        }
    }

    // ── Route ──
    let outcome = optimizer::optimize_with(&strategy, &ctx.market, ctx.max_passes);
    if !outcome.incompatibilities.is_empty() {
        return Err(PlanError::Incompatible(outcome.incompatibilities));
    }
    let strategy = outcome.strategy;
    if outcome.inserted_count > 0 {
        debug!(inserted = outcome.inserted_count, "auto-wrap blocks inserted for plan");
    }

    let report = validate::validate(&strategy);
    if !report.is_valid {
        return Err(PlanError::InvalidStrategy(report.errors));
    }

    // ── Steps ──
    let simulation = simulator::run(&strategy, ctx.eth_price, &ctx.market);
    let mut warnings = simulation.result.warnings.clone();
    let initial_value = simulation.result.initial_value;

    let blocks = strategy.block_map();
    let mut steps = Vec::new();
    for visit in &simulation.trace {
        if visit.inflow.value_usd <= 0.0 {
            continue;
        }
        let Some(&block) = blocks.get(visit.block_id.as_str()) else {
            continue;
        };

        let amount_in = if is_whole_input(&visit.inflow, input_asset, initial_value) {
            input_amount
        } else {
            units(&visit.inflow, ctx)
        };
        let request = EncodeRequest {
            block,
            wallet,
            asset_in: visit.inflow.asset,
            amount_in,
            asset_out: visit.outflow.asset,
            amount_out: units(&visit.outflow, ctx),
        };

        for call in ctx.encoder.encode(&request)? {
            if let Some(approve) = approve_step(&call, visit, block.chain_id) {
                steps.push(approve);
            }
            steps.push(call_step(call, visit, block.chain_id));
        }
    }

    // ── Gas ──
    let mut gas_by_chain: BTreeMap<u64, u64> = BTreeMap::new();
    for step in &steps {
        *gas_by_chain.entry(step.chain_id).or_default() += step.estimated_gas;
    }
    let estimated_total_gas = gas_by_chain.values().sum();

    let mut gas_prices = Vec::new();
    let mut estimated_total_gas_usd = 0.0;
    for (&chain_id, &gas_units) in &gas_by_chain {
        match tokio::time::timeout(ctx.gas_timeout, ctx.gas_oracle.gas_price(chain_id)).await {
            Ok(Ok(wei)) => {
                estimated_total_gas_usd += gas::gas_cost_usd(gas_units, wei, ctx.eth_price);
                gas_prices.push(ChainGasPrice { chain_id, wei });
            }
            Ok(Err(e)) => {
                warn!(chain_id, error = %e, "gas price lookup failed");
                warnings.push(format!("Gas price unavailable on chain {chain_id}: {e}"));
            }
            Err(_) => {
                warn!(chain_id, "gas price lookup timed out");
                warnings.push(format!(
                    "Gas price lookup on chain {chain_id} timed out after {}ms",
                    ctx.gas_timeout.as_millis()
                ));
            }
        }
    }

    let created_at = Utc::now();
    let plan = TransactionPlan {
        id: Uuid::new_v4().to_string(),
        wallet,
        strategy_name: strategy.name.clone(),
        input_asset,
        input_amount,
        steps,
        estimated_total_gas,
        estimated_total_gas_usd,
        eth_price: ctx.eth_price,
        gas_prices,
        created_at,
        expires_at: created_at + ctx.ttl,
        warnings,
    };

    info!(
        plan_id = %plan.id,
        wallet = %evm::short_addr(&wallet),
        steps = plan.steps.len(),
        gas = plan.estimated_total_gas,
        "transaction plan built"
    );
    Ok(plan)
}

// ── Helpers ──────────────────────────────────────────────────────────

/// The visit receives the full input untouched, so the exact requested
/// amount is used instead of a USD round trip.
fn is_whole_input(inflow: &Flow, input_asset: Asset, initial_value: f64) -> bool {
    inflow.asset == Some(input_asset)
        && initial_value > 0.0
        && (inflow.value_usd - initial_value).abs() <= initial_value * 1e-12
}

fn units(flow: &Flow, ctx: &PlanContext) -> U256 {
    match flow.asset {
        Some(asset) => evm::to_token_units(
            flow.value_usd,
            ctx.market.price_usd(asset, ctx.eth_price),
            asset.decimals(),
        ),
        None => U256::ZERO,
    }
}

fn step_id(visit: &Visit, action: StepAction) -> String {
    format!("{}:{}:{}", visit.block_id, visit.iteration, action)
}

fn approve_step(call: &EncodedCall, visit: &Visit, chain_id: u64) -> Option<Step> {
    let spender = call.spender?;
    let token_in = call.token_in.clone()?;
    let token = token_in.address?;
    let data = IERC20::approveCall {
        spender,
        amount: token_in.amount,
    }
    .abi_encode();

    Some(Step {
        id: step_id(visit, StepAction::Approve),
        action: StepAction::Approve,
        protocol: call.protocol.clone(),
        chain_id,
        to: token,
        data: data.into(),
        value: U256::ZERO,
        token_in: Some(token_in),
        token_out: None,
        spender: Some(spender),
        estimated_gas: gas::estimate(StepAction::Approve, &call.protocol),
        source_block_id: visit.block_id.clone(),
        iteration: visit.iteration,
        approval_status: None,
        batch_info: None,
    })
}

fn call_step(call: EncodedCall, visit: &Visit, chain_id: u64) -> Step {
    Step {
        id: step_id(visit, call.action),
        estimated_gas: gas::estimate(call.action, &call.protocol),
        action: call.action,
        protocol: call.protocol,
        chain_id,
        to: call.to,
        data: call.data,
        value: call.value,
        token_in: call.token_in,
        token_out: call.token_out,
        spender: call.spender,
        source_block_id: visit.block_id.clone(),
        iteration: visit.iteration,
        approval_status: None,
        batch_info: None,
    }
}
