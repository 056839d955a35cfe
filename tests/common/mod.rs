#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use strategy_flow::market::MarketData;
use strategy_flow::model::{Asset, Block, BlockParams, Edge, Protocol, Strategy};
use strategy_flow::plan::approvals::AllowanceReader;
use strategy_flow::plan::{AbiEncoder, GasOracle, PlanContext, StaticGasOracle};

pub const ETH_PRICE: f64 = 3000.0;

// ── Block builders ───────────────────────────────────────────────────

pub fn block(id: &str, params: BlockParams) -> Block {
    Block {
        id: id.into(),
        chain_id: 1,
        params,
    }
}

pub fn input(id: &str, asset: Asset, amount: f64) -> Block {
    block(id, BlockParams::Input { asset, amount })
}

pub fn stake(id: &str, protocol: Protocol) -> Block {
    block(
        id,
        BlockParams::Stake {
            protocol,
            asset: Asset::ETH,
        },
    )
}

pub fn lend(id: &str, protocol: Protocol, asset: Asset) -> Block {
    block(id, BlockParams::Lend { protocol, asset })
}

pub fn borrow(id: &str, asset: Asset, target_ltv: f64) -> Block {
    block(
        id,
        BlockParams::Borrow {
            protocol: Protocol::AaveV3,
            asset,
            target_ltv,
        },
    )
}

pub fn swap(id: &str, to_asset: Asset) -> Block {
    block(
        id,
        BlockParams::Swap {
            protocol: Protocol::UniswapV3,
            to_asset,
            slippage_bps: None,
        },
    )
}

pub fn looped(id: &str, iterations: u32) -> Block {
    block(id, BlockParams::Loop { iterations })
}

pub fn edge(id: &str, source: &str, target: &str, flow_percent: f64) -> Edge {
    Edge::new(id, source, target, flow_percent)
}

// ── Scenarios ────────────────────────────────────────────────────────

/// 10 ETH staked with ether.fi, receipt supplied to Aave as weETH.
pub fn restake_and_lend() -> Strategy {
    Strategy::new(
        vec![
            input("input", Asset::ETH, 10.0),
            stake("stake", Protocol::EtherFi),
            lend("lend", Protocol::AaveV3, Asset::WeEth),
        ],
        vec![
            edge("e1", "input", "stake", 100.0),
            edge("e2", "stake", "lend", 100.0),
        ],
    )
}

/// [`restake_and_lend`] plus a USDC borrow at `ltv`.
pub fn restake_lend_borrow(ltv: f64) -> Strategy {
    let mut strategy = restake_and_lend();
    strategy.blocks.push(borrow("borrow", Asset::USDC, ltv));
    strategy.edges.push(edge("e3", "lend", "borrow", 100.0));
    strategy
}

/// Reference market with ether.fi at 3% and Aave weETH supply at 2%.
pub fn scenario_market() -> MarketData {
    let mut market = MarketData::default();
    market.yields.set_supply(Protocol::EtherFi, Asset::ETH, 3.0);
    market.yields.set_supply(Protocol::AaveV3, Asset::WeEth, 2.0);
    market
}

pub fn wallet() -> Address {
    Address::repeat_byte(0x42)
}

pub fn eth(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

pub fn plan_context(market: MarketData, oracle: Arc<dyn GasOracle>) -> PlanContext {
    PlanContext::new(
        Arc::new(market),
        ETH_PRICE,
        Arc::new(AbiEncoder::default()),
        oracle,
    )
}

pub fn static_context(market: MarketData) -> PlanContext {
    plan_context(market, Arc::new(StaticGasOracle::gwei(10.0)))
}

// ── Mocks ────────────────────────────────────────────────────────────

pub struct FailingGasOracle;

#[async_trait]
impl GasOracle for FailingGasOracle {
    async fn gas_price(&self, chain_id: u64) -> anyhow::Result<u128> {
        anyhow::bail!("rpc unreachable for chain {chain_id}")
    }
}

pub struct SlowGasOracle;

#[async_trait]
impl GasOracle for SlowGasOracle {
    async fn gas_price(&self, _chain_id: u64) -> anyhow::Result<u128> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1)
    }
}

/// Allowances keyed by token; tokens in `failing` error out.
#[derive(Default)]
pub struct MockAllowances {
    pub allowances: HashMap<Address, U256>,
    pub failing: HashSet<Address>,
    pub reads: AtomicUsize,
}

impl MockAllowances {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AllowanceReader for MockAllowances {
    async fn allowance(
        &self,
        _chain_id: u64,
        token: Address,
        _owner: Address,
        _spender: Address,
    ) -> anyhow::Result<U256> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&token) {
            anyhow::bail!("execution reverted");
        }
        Ok(self.allowances.get(&token).copied().unwrap_or(U256::ZERO))
    }
}
