use std::collections::HashMap;

use alloy::providers::Provider;
use anyhow::Context;
use async_trait::async_trait;

use super::StepAction;
use super::evm;

/// Intrinsic cost of any transaction.
pub const BASE_TX_GAS: u64 = 21_000;

/// Gas units for one step, including [`BASE_TX_GAS`].
///
/// Figures are typical mainnet costs for each entry point; the plan only
/// needs an order of magnitude for cost display and batching savings.
pub fn estimate(action: StepAction, protocol: &str) -> u64 {
    match (action, protocol) {
        (StepAction::Approve, _) => 46_000,
        (StepAction::Stake, "lido") => 90_000,
        (StepAction::Stake, "ether_fi") => 110_000,
        (StepAction::Stake, "rocket_pool") => 180_000,
        (StepAction::Stake, _) => 120_000,
        (StepAction::Supply, "compound_v3") => 150_000,
        (StepAction::Supply, _) => 250_000,
        (StepAction::Borrow, "compound_v3") => 180_000,
        (StepAction::Borrow, _) => 300_000,
        (StepAction::Swap, _) => 180_000,
        (StepAction::Wrap, "WETH") => 45_000,
        (StepAction::Wrap, _) => 60_000,
        (StepAction::Unwrap, "WETH") => 35_000,
        (StepAction::Unwrap, _) => 50_000,
    }
}

/// USD cost of `gas` units at `wei_per_gas`, with gas paid in ETH.
pub fn gas_cost_usd(gas: u64, wei_per_gas: u128, eth_price: f64) -> f64 {
    gas as f64 * wei_per_gas as f64 / 1e18 * eth_price
}

// ── Gas price sources ────────────────────────────────────────────────

#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Current gas price on `chain_id`, in wei.
    async fn gas_price(&self, chain_id: u64) -> anyhow::Result<u128>;
}

/// Reads `eth_gasPrice` from a configured RPC endpoint per chain.
#[derive(Debug, Clone, Default)]
pub struct RpcGasOracle {
    endpoints: HashMap<u64, String>,
}

impl RpcGasOracle {
    pub fn new(endpoints: HashMap<u64, String>) -> Self {
        RpcGasOracle { endpoints }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn gas_price(&self, chain_id: u64) -> anyhow::Result<u128> {
        let url = self
            .endpoints
            .get(&chain_id)
            .with_context(|| format!("no RPC endpoint configured for chain {chain_id}"))?;
        let provider = evm::read_provider(url)?;
        let price = provider
            .get_gas_price()
            .await
            .with_context(|| format!("eth_gasPrice failed on chain {chain_id}"))?;
        Ok(price)
    }
}

/// Fixed gas price for every chain. Used offline and in tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticGasOracle {
    pub wei: u128,
}

impl StaticGasOracle {
    pub fn gwei(gwei: f64) -> Self {
        StaticGasOracle {
            wei: (gwei * 1e9) as u128,
        }
    }
}

#[async_trait]
impl GasOracle for StaticGasOracle {
    async fn gas_price(&self, _chain_id: u64) -> anyhow::Result<u128> {
        Ok(self.wei)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_include_base_cost() {
        for action in [
            StepAction::Approve,
            StepAction::Stake,
            StepAction::Supply,
            StepAction::Borrow,
            StepAction::Swap,
            StepAction::Wrap,
            StepAction::Unwrap,
        ] {
            assert!(estimate(action, "aave_v3") > BASE_TX_GAS);
        }
        assert!(estimate(StepAction::Supply, "compound_v3") < estimate(StepAction::Supply, "aave_v3"));
    }

    #[test]
    fn prices_gas_in_usd() {
        // 100k gas at 10 gwei is 0.001 ETH
        let usd = gas_cost_usd(100_000, 10_000_000_000, 3000.0);
        assert!((usd - 3.0).abs() < 1e-9);
    }
}
