mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use chrono::Utc;

use strategy_flow::market::MarketData;
use strategy_flow::model::{Asset, Protocol, Strategy};
use strategy_flow::plan::approvals::ApprovalError;
use strategy_flow::plan::encode::{ContractBook, EncodeError};
use strategy_flow::plan::{
    Freshness, PlanError, StepAction, TransactionPlan, build_plan, check_approvals, evm,
};

use common::*;

async fn scenario_plan() -> TransactionPlan {
    let ctx = static_context(scenario_market());
    build_plan(&restake_lend_borrow(0.5), eth(10), Asset::ETH, wallet(), &ctx)
        .await
        .expect("plan builds")
}

/// Every step that pulls an ERC-20 has an earlier approve for the same
/// token and spender.
fn assert_approved_before_use(plan: &TransactionPlan) {
    for (i, step) in plan.steps.iter().enumerate() {
        if step.is_approve() {
            continue;
        }
        let (Some(spender), Some(token)) = (
            step.spender,
            step.token_in.as_ref().and_then(|t| t.address),
        ) else {
            continue;
        };
        let approved = plan.steps[..i]
            .iter()
            .any(|s| s.is_approve() && s.to == token && s.spender == Some(spender));
        assert!(approved, "step {} spends {token} without approval", step.id);
    }
}

#[tokio::test]
async fn scenario_plan_orders_steps_topologically() {
    let plan = scenario_plan().await;
    let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "stake:0:stake",
            "wrap-stake-lend:0:approve",
            "wrap-stake-lend:0:wrap",
            "lend:0:approve",
            "lend:0:supply",
            "borrow:0:borrow",
        ]
    );
    assert_approved_before_use(&plan);
}

#[tokio::test]
async fn stake_sends_the_exact_input_amount() {
    let ctx = static_context(scenario_market());
    let amount = U256::from(7_500_000_000_000_000_000u128);
    let plan = build_plan(&restake_and_lend(), amount, Asset::ETH, wallet(), &ctx)
        .await
        .unwrap();

    let stake = plan.step("stake:0:stake").unwrap();
    assert_eq!(stake.action, StepAction::Stake);
    assert_eq!(stake.value, amount);
    assert_eq!(stake.spender, None);
    assert_eq!(stake.to, ContractBook::default().get(1, Protocol::EtherFi).unwrap());
    assert_eq!(plan.input_amount, amount);
}

#[tokio::test]
async fn approvals_encode_erc20_approve() {
    let plan = scenario_plan().await;
    let approve = plan.step("lend:0:approve").unwrap();
    let supply = plan.step("lend:0:supply").unwrap();

    assert_eq!(hex::encode(&approve.data[..4]), "095ea7b3");
    assert_eq!(Some(approve.to), evm::token_address(1, Asset::WeEth));
    assert_eq!(approve.spender, Some(supply.to));
    assert_eq!(approve.value, U256::ZERO);
    assert_eq!(
        approve.token_in.as_ref().map(|t| t.amount),
        supply.token_in.as_ref().map(|t| t.amount)
    );
    assert_eq!(approve.protocol, "aave_v3");
}

#[tokio::test]
async fn gas_is_summed_and_priced() {
    let plan = scenario_plan().await;
    let total: u64 = plan.steps.iter().map(|s| s.estimated_gas).sum();
    assert_eq!(plan.estimated_total_gas, total);
    assert_eq!(plan.gas_price(1), Some(10_000_000_000));

    let expected_usd = total as f64 * 10e9 / 1e18 * ETH_PRICE;
    assert!((plan.estimated_total_gas_usd - expected_usd).abs() < 1e-9);
    assert!(plan.warnings.is_empty(), "warnings: {:?}", plan.warnings);
}

#[tokio::test]
async fn plan_expires_after_ttl() {
    let plan = scenario_plan().await;
    assert_eq!(plan.expires_at - plan.created_at, chrono::Duration::seconds(300));
    assert_eq!(plan.freshness(plan.created_at), Freshness::Fresh);
    assert_eq!(plan.freshness(plan.expires_at), Freshness::Expired);
}

#[tokio::test]
async fn expired_plan_cannot_be_checked() {
    let mut plan = scenario_plan().await;
    plan.expires_at = Utc::now() - chrono::Duration::seconds(1);

    let reader = Arc::new(MockAllowances::default());
    let err = check_approvals(&plan, wallet(), reader.clone(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::PlanExpired { ref plan_id, .. } if *plan_id == plan.id));
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn failing_gas_oracle_becomes_a_warning() {
    let ctx = plan_context(scenario_market(), Arc::new(FailingGasOracle));
    let plan = build_plan(&restake_and_lend(), eth(1), Asset::ETH, wallet(), &ctx)
        .await
        .unwrap();
    assert!(plan.gas_prices.is_empty());
    assert_eq!(plan.estimated_total_gas_usd, 0.0);
    assert!(plan.estimated_total_gas > 0);
    assert!(
        plan.warnings
            .iter()
            .any(|w| w.contains("Gas price unavailable on chain 1"))
    );
}

#[tokio::test(start_paused = true)]
async fn slow_gas_oracle_times_out() {
    let ctx = plan_context(scenario_market(), Arc::new(SlowGasOracle))
        .with_gas_timeout(Duration::from_millis(500));
    let plan = build_plan(&restake_and_lend(), eth(1), Asset::ETH, wallet(), &ctx)
        .await
        .unwrap();
    assert!(plan.gas_prices.is_empty());
    assert!(plan.warnings.iter().any(|w| w.contains("timed out")));
}

#[tokio::test]
async fn custom_ttl_is_respected() {
    let ctx = static_context(scenario_market()).with_ttl(chrono::Duration::seconds(30));
    let plan = build_plan(&restake_and_lend(), eth(1), Asset::ETH, wallet(), &ctx)
        .await
        .unwrap();
    assert_eq!(plan.expires_at - plan.created_at, chrono::Duration::seconds(30));
}

#[tokio::test]
async fn rejects_zero_and_mismatched_input() {
    let ctx = static_context(scenario_market());
    let zero = build_plan(&restake_and_lend(), U256::ZERO, Asset::ETH, wallet(), &ctx).await;
    assert!(matches!(zero, Err(PlanError::ZeroAmount)));

    let wrong = build_plan(&restake_and_lend(), eth(1), Asset::USDC, wallet(), &ctx).await;
    assert!(matches!(
        wrong,
        Err(PlanError::InputMismatch {
            expected: Asset::ETH,
            requested: Asset::USDC
        })
    ));
}

#[tokio::test]
async fn incompatible_route_aborts_the_build() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::ETH, 1.0),
            stake("stake", Protocol::Lido),
            lend("lend", Protocol::AaveV3, Asset::WeEth),
        ],
        vec![
            edge("e1", "input", "stake", 100.0),
            edge("e2", "stake", "lend", 100.0),
        ],
    );
    let ctx = static_context(MarketData::default());
    let err = build_plan(&strategy, eth(1), Asset::ETH, wallet(), &ctx)
        .await
        .unwrap_err();
    let PlanError::Incompatible(items) = err else {
        panic!("expected incompatibility, got {err:?}");
    };
    assert_eq!(items[0].edge_id, "e2");
}

#[tokio::test]
async fn invalid_strategy_aborts_the_build() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::WETH, 1.0),
            input("second", Asset::WETH, 1.0),
            lend("lend", Protocol::AaveV3, Asset::WETH),
        ],
        vec![edge("e1", "input", "lend", 100.0)],
    );
    let ctx = static_context(MarketData::default());
    let err = build_plan(&strategy, eth(1), Asset::WETH, wallet(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::InvalidStrategy(ref errors) if !errors.is_empty()));
}

#[tokio::test]
async fn lending_native_eth_is_an_encode_error() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::ETH, 1.0),
            lend("lend", Protocol::AaveV3, Asset::ETH),
        ],
        vec![edge("e1", "input", "lend", 100.0)],
    );
    let ctx = static_context(MarketData::default());
    let err = build_plan(&strategy, eth(1), Asset::ETH, wallet(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::Encode(EncodeError::Unsupported { .. })));
}

#[tokio::test]
async fn loop_iterations_become_separate_steps() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::USDC, 1000.0),
            lend("lend", Protocol::AaveV3, Asset::USDC),
            borrow("borrow", Asset::USDC, 0.5),
            looped("loop", 2),
        ],
        vec![
            edge("e1", "input", "lend", 100.0),
            edge("e2", "lend", "borrow", 100.0),
            edge("e3", "borrow", "loop", 100.0),
            edge("back", "loop", "lend", 100.0),
        ],
    );
    let ctx = static_context(MarketData::default());
    let plan = build_plan(
        &strategy,
        U256::from(1_000_000_000u64),
        Asset::USDC,
        wallet(),
        &ctx,
    )
    .await
    .unwrap();

    let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "lend:0:approve",
            "lend:0:supply",
            "borrow:0:borrow",
            "lend:1:approve",
            "lend:1:supply",
            "borrow:1:borrow",
        ]
    );
    let second_supply = plan.step("lend:1:supply").unwrap();
    assert_eq!(
        second_supply.token_in.as_ref().map(|t| t.amount),
        Some(U256::from(500_000_000u64))
    );
    assert_approved_before_use(&plan);
}
