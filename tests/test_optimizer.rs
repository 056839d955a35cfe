mod common;

use strategy_flow::engine::{optimize, optimize_with, simulator};
use strategy_flow::market::MarketData;
use strategy_flow::market::compat::Wrapper;
use strategy_flow::model::{Asset, BlockParams, Protocol, Strategy};
use strategy_flow::validate::validate;

use common::*;

#[test]
fn eeth_into_aave_gets_exactly_one_wrap() {
    let outcome = optimize(&restake_and_lend(), &MarketData::default());
    assert_eq!(outcome.inserted_count, 1);
    assert!(outcome.incompatibilities.is_empty());

    let wraps: Vec<_> = outcome
        .strategy
        .blocks
        .iter()
        .filter_map(|b| match &b.params {
            BlockParams::AutoWrap(w) => Some((b, w)),
            _ => None,
        })
        .collect();
    assert_eq!(wraps.len(), 1);
    let (block, wrap) = wraps[0];
    assert!(wrap.is_wrap);
    assert_eq!(wrap.from_asset, Asset::EEth);
    assert_eq!(wrap.to_asset, Asset::WeEth);
    assert_eq!(block.chain_id, 1);

    // stake -> wrap -> lend
    let strategy = &outcome.strategy;
    assert!(strategy.outgoing("stake").all(|e| e.target == block.id));
    assert!(strategy.incoming("lend").all(|e| e.source == block.id));
    assert!(validate(strategy).is_valid);
}

#[test]
fn optimizing_twice_inserts_nothing() {
    let market = MarketData::default();
    for strategy in [restake_and_lend(), restake_lend_borrow(0.5)] {
        let once = optimize(&strategy, &market);
        let twice = optimize(&once.strategy, &market);
        assert_eq!(twice.inserted_count, 0);
        assert_eq!(twice.strategy, once.strategy);
    }
}

#[test]
fn compatible_graph_is_left_untouched() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::USDC, 1000.0),
            lend("lend", Protocol::CompoundV3, Asset::USDC),
        ],
        vec![edge("e1", "input", "lend", 100.0)],
    );
    let outcome = optimize(&strategy, &MarketData::default());
    assert_eq!(outcome.inserted_count, 0);
    assert_eq!(outcome.strategy, strategy);
}

#[test]
fn unwrappable_pair_is_reported() {
    // Lido mints stETH; nothing converts stETH into weETH.
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
    let outcome = optimize(&strategy, &MarketData::default());
    assert_eq!(outcome.inserted_count, 0);
    assert_eq!(outcome.incompatibilities.len(), 1);
    let incompatibility = &outcome.incompatibilities[0];
    assert_eq!(incompatibility.edge_id, "e2");
    assert_eq!(incompatibility.from_asset, Asset::StEth);
    assert_eq!(incompatibility.to_asset, Asset::WeEth);
}

#[test]
fn partial_edge_keeps_its_share_through_the_wrap() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::ETH, 10.0),
            stake("stake", Protocol::EtherFi),
            lend("lend", Protocol::AaveV3, Asset::WeEth),
        ],
        vec![
            edge("e1", "input", "stake", 100.0),
            edge("e2", "stake", "lend", 60.0),
        ],
    );
    let outcome = optimize(&strategy, &scenario_market());
    assert_eq!(outcome.inserted_count, 1);

    let result = simulator::simulate_strategy(&outcome.strategy, ETH_PRICE, &scenario_market());
    let lend = result.blocks.iter().find(|b| b.block_id == "lend").unwrap();
    assert!((lend.value_usd - 0.6 * 30_000.0).abs() < 1e-6);
}

#[test]
fn wrapped_receipt_into_canonical_market_is_unwrapped() {
    // weETH supplied, then withdrawn to a block expecting eETH is not a
    // realistic route, but exercises the unwrap direction.
    let strategy = Strategy::new(
        vec![
            input("input", Asset::WeEth, 1.0),
            block(
                "unwrap-target",
                BlockParams::Lend {
                    protocol: Protocol::AaveV3,
                    asset: Asset::EEth,
                },
            ),
        ],
        vec![edge("e1", "input", "unwrap-target", 100.0)],
    );
    let outcome = optimize(&strategy, &MarketData::default());
    assert_eq!(outcome.inserted_count, 1);
    let wrap = outcome
        .strategy
        .blocks
        .iter()
        .find_map(|b| match &b.params {
            BlockParams::AutoWrap(w) => Some(w),
            _ => None,
        })
        .unwrap();
    assert!(!wrap.is_wrap);
    assert_eq!(wrap.from_asset, Asset::WeEth);
    assert_eq!(wrap.to_asset, Asset::EEth);
}

/// WETH reaches eETH only through ETH: one wrap block per pass.
fn two_hop_market() -> MarketData {
    let mut market = MarketData::default();
    market.compat.wrappers.push(Wrapper {
        chain_id: 1,
        from_asset: Asset::WETH,
        to_asset: Asset::ETH,
        is_wrap: false,
        contract: "0x0000000000000000000000000000000000000001".into(),
    });
    market.compat.wrappers.push(Wrapper {
        chain_id: 1,
        from_asset: Asset::ETH,
        to_asset: Asset::EEth,
        is_wrap: true,
        contract: "0x0000000000000000000000000000000000000002".into(),
    });
    market
}

fn weth_into_eeth_lend() -> Strategy {
    Strategy::new(
        vec![
            input("input", Asset::WETH, 1.0),
            lend("lend", Protocol::AaveV3, Asset::EEth),
        ],
        vec![edge("e1", "input", "lend", 100.0)],
    )
}

#[test]
fn pass_cap_reports_remaining_mismatch() {
    let outcome = optimize_with(&weth_into_eeth_lend(), &two_hop_market(), 1);
    assert_eq!(outcome.inserted_count, 1);
    assert_eq!(outcome.incompatibilities.len(), 1);
    let remaining = &outcome.incompatibilities[0];
    assert_eq!(remaining.reason, "still incompatible after 1 optimization passes");
    assert_eq!(remaining.from_asset, Asset::ETH);
    assert_eq!(remaining.to_asset, Asset::EEth);
    assert_eq!(remaining.target, "lend");
}

#[test]
fn two_hop_chain_converges_within_default_passes() {
    let outcome = optimize_with(&weth_into_eeth_lend(), &two_hop_market(), 8);
    assert_eq!(outcome.inserted_count, 2);
    assert!(outcome.incompatibilities.is_empty());
    assert!(validate(&outcome.strategy).is_valid);
}
