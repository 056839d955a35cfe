pub mod compat;
#[cfg(feature = "full")]
pub mod defillama;
pub mod yields;

use std::path::Path;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Asset, Protocol};

pub use compat::{Compatibility, StakeReceipt, Wrapper};
pub use yields::{RateEntry, YieldTable};

/// Liquidation threshold applied to all collateral.
///
/// Lending markets set thresholds per collateral asset; the simulation
/// deliberately uses one market-wide value, even when a strategy mixes
/// several collateral assets.
pub const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.8;

/// Default swap slippage for DEX blocks without an override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DexSlippage {
    pub protocol: Protocol,
    pub bps: f64,
}

/// USD price override for one asset (depegs, non-ETH-pegged tokens).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PriceOverride {
    pub asset: Asset,
    pub usd: f64,
}

/// Every externally sourced number the engine consumes besides the ETH
/// price: rates, risk parameters, compatibility metadata. Passed by
/// reference into each engine call; the engine never fetches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketData {
    #[serde(default = "YieldTable::reference")]
    pub yields: YieldTable,
    #[serde(default = "default_liquidation_threshold")]
    pub liquidation_threshold: f64,
    #[serde(default = "default_slippage")]
    pub slippage: Vec<DexSlippage>,
    #[serde(default = "Compatibility::reference")]
    pub compat: Compatibility,
    #[serde(default)]
    pub prices: Vec<PriceOverride>,
}

fn default_liquidation_threshold() -> f64 {
    DEFAULT_LIQUIDATION_THRESHOLD
}

fn default_slippage() -> Vec<DexSlippage> {
    vec![DexSlippage {
        protocol: Protocol::UniswapV3,
        bps: 30.0,
    }]
}

impl Default for MarketData {
    fn default() -> Self {
        MarketData {
            yields: YieldTable::reference(),
            liquidation_threshold: DEFAULT_LIQUIDATION_THRESHOLD,
            slippage: default_slippage(),
            compat: Compatibility::reference(),
            prices: Vec::new(),
        }
    }
}

impl MarketData {
    /// Market data with no rates at all; compatibility metadata is kept.
    pub fn without_rates() -> Self {
        MarketData {
            yields: YieldTable::default(),
            slippage: Vec::new(),
            ..MarketData::default()
        }
    }

    /// Load a JSON snapshot. Missing sections fall back to built-in defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading market data {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing market data {}", path.display()))
    }

    pub fn supply_apy(&self, protocol: Protocol, asset: Asset) -> Option<f64> {
        self.yields.supply_apy(protocol, asset)
    }

    pub fn borrow_apr(&self, protocol: Protocol, asset: Asset) -> Option<f64> {
        self.yields.borrow_apr(protocol, asset)
    }

    pub fn slippage_bps(&self, protocol: Protocol) -> Option<f64> {
        self.slippage
            .iter()
            .find(|s| s.protocol == protocol)
            .map(|s| s.bps)
    }

    /// USD price of `asset`. Overrides win; otherwise ETH-family assets
    /// track `eth_price` and stablecoins sit at 1.0.
    pub fn price_usd(&self, asset: Asset, eth_price: f64) -> f64 {
        if let Some(p) = self.prices.iter().find(|p| p.asset == asset) {
            return p.usd;
        }
        if asset.is_stable() { 1.0 } else { eth_price }
    }

    pub fn stake_receipt(&self, protocol: Protocol, deposit: Asset) -> Option<Asset> {
        self.compat.stake_receipt(protocol, deposit)
    }

    pub fn wrapper_path(&self, chain_id: u64, from: Asset, to: Asset) -> Option<Vec<&Wrapper>> {
        self.compat.wrapper_path(chain_id, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_snapshot_keeps_defaults() {
        let market: MarketData =
            serde_json::from_str(r#"{ "liquidation_threshold": 0.75 }"#).unwrap();
        assert_eq!(market.liquidation_threshold, 0.75);
        assert_eq!(market.supply_apy(Protocol::EtherFi, Asset::ETH), Some(3.0));
        assert_eq!(market.stake_receipt(Protocol::Lido, Asset::ETH), Some(Asset::StEth));
    }

    #[test]
    fn price_overrides_take_precedence() {
        let mut market = MarketData::default();
        assert_eq!(market.price_usd(Asset::WeEth, 3000.0), 3000.0);
        assert_eq!(market.price_usd(Asset::USDC, 3000.0), 1.0);
        market.prices.push(PriceOverride {
            asset: Asset::WeEth,
            usd: 3150.0,
        });
        assert_eq!(market.price_usd(Asset::WeEth, 3000.0), 3150.0);
    }
}
