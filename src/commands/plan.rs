use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result, anyhow};

use crate::config::EngineConfig;
use crate::model::BlockParams;
use crate::plan::approvals::RpcAllowanceReader;
use crate::plan::gas::RpcGasOracle;
use crate::plan::{AbiEncoder, PlanBundle, PlanContext, build_plan, check_approvals, evm};
use crate::validate;

pub struct PlanArgs<'a> {
    pub file: &'a Path,
    pub wallet: &'a str,
    pub eth_price: f64,
    pub amount: Option<f64>,
    pub market: Option<&'a Path>,
    pub check_approvals: bool,
    pub output: Option<&'a Path>,
}

pub async fn run(args: PlanArgs<'_>, config: &EngineConfig) -> Result<()> {
    let strategy = validate::load_strategy(args.file)?;
    let market = super::load_market(args.market, config)?;
    let wallet: Address = args
        .wallet
        .parse()
        .with_context(|| format!("invalid wallet address `{}`", args.wallet))?;

    let (input_asset, default_amount) = strategy
        .input_block()
        .and_then(|b| match &b.params {
            BlockParams::Input { asset, amount } => Some((*asset, *amount)),
            _ => None,
        })
        .ok_or_else(|| anyhow!("strategy needs exactly one input block"))?;
    let amount = args.amount.unwrap_or(default_amount);
    let input_amount = evm::to_token_units(amount, 1.0, input_asset.decimals());

    let endpoints = config.rpc_endpoints()?;
    let ctx = PlanContext::new(
        Arc::new(market),
        args.eth_price,
        Arc::new(AbiEncoder::default()),
        Arc::new(RpcGasOracle::new(endpoints.clone())),
    )
    .with_ttl(config.ttl())
    .with_gas_timeout(config.gas_timeout())
    .with_max_passes(config.optimizer.max_passes);

    let plan = build_plan(&strategy, input_amount, input_asset, wallet, &ctx).await?;

    let approvals = if args.check_approvals {
        let reader = Arc::new(RpcAllowanceReader::new(endpoints));
        Some(check_approvals(&plan, wallet, reader, config.allowance_timeout()).await?)
    } else {
        None
    };

    let bundle = PlanBundle::assemble(plan, approvals);
    eprintln!(
        "Plan {}: {} step(s), {} transaction(s) after batching, ~{} gas (${:.2}), expires {}",
        bundle.plan.id,
        bundle.plan.steps.len(),
        bundle.batching.transactions_after,
        bundle.plan.estimated_total_gas,
        bundle.plan.estimated_total_gas_usd,
        bundle.plan.expires_at.to_rfc3339(),
    );
    for warning in &bundle.plan.warnings {
        eprintln!("  warning: {warning}");
    }

    super::emit_json(&bundle, args.output)
}
