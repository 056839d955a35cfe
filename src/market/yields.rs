use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Asset, Protocol};

/// Supply / borrow rates for one protocol + asset market, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RateEntry {
    pub protocol: Protocol,
    pub asset: Asset,
    /// Supply (or staking) APY, e.g. 3.0 = 3%.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_apy: Option<f64>,
    /// Variable borrow APR, e.g. 5.5 = 5.5%.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_apr: Option<f64>,
}

/// Per-protocol, per-asset rate table. Refreshed by the caller
/// (hourly from DefiLlama in production); the engine only reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct YieldTable {
    entries: Vec<RateEntry>,
}

impl YieldTable {
    pub fn new(entries: Vec<RateEntry>) -> Self {
        YieldTable { entries }
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn supply_apy(&self, protocol: Protocol, asset: Asset) -> Option<f64> {
        self.find(protocol, asset).and_then(|e| e.supply_apy)
    }

    pub fn borrow_apr(&self, protocol: Protocol, asset: Asset) -> Option<f64> {
        self.find(protocol, asset).and_then(|e| e.borrow_apr)
    }

    /// Insert or overwrite the supply APY for a market.
    pub fn set_supply(&mut self, protocol: Protocol, asset: Asset, apy: f64) {
        self.entry_mut(protocol, asset).supply_apy = Some(apy);
    }

    /// Insert or overwrite the borrow APR for a market.
    pub fn set_borrow(&mut self, protocol: Protocol, asset: Asset, apr: f64) {
        self.entry_mut(protocol, asset).borrow_apr = Some(apr);
    }

    fn find(&self, protocol: Protocol, asset: Asset) -> Option<&RateEntry> {
        self.entries
            .iter()
            .find(|e| e.protocol == protocol && e.asset == asset)
    }

    fn entry_mut(&mut self, protocol: Protocol, asset: Asset) -> &mut RateEntry {
        let idx = match self
            .entries
            .iter()
            .position(|e| e.protocol == protocol && e.asset == asset)
        {
            Some(idx) => idx,
            None => {
                self.entries.push(RateEntry {
                    protocol,
                    asset,
                    supply_apy: None,
                    borrow_apr: None,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    /// Reference rates used when no market snapshot is supplied.
    /// Collateral-only markets carry an explicit 0.0 supply APY.
    pub fn reference() -> Self {
        use Asset::*;
        use Protocol::*;

        let rate = |protocol, asset, supply: Option<f64>, borrow: Option<f64>| RateEntry {
            protocol,
            asset,
            supply_apy: supply,
            borrow_apr: borrow,
        };

        YieldTable::new(vec![
            // ── Staking ──
            rate(Lido, ETH, Some(2.9), None),
            rate(EtherFi, ETH, Some(3.0), None),
            rate(RocketPool, ETH, Some(2.7), None),
            // ── Aave V3 ──
            rate(AaveV3, WETH, Some(1.9), Some(2.6)),
            rate(AaveV3, WstEth, Some(0.1), Some(0.3)),
            rate(AaveV3, WeEth, Some(0.1), Some(0.4)),
            rate(AaveV3, REth, Some(0.05), Some(0.4)),
            rate(AaveV3, USDC, Some(4.5), Some(5.9)),
            rate(AaveV3, USDT, Some(4.6), Some(6.0)),
            rate(AaveV3, DAI, Some(4.2), Some(5.6)),
            // ── Spark ──
            rate(Spark, WETH, Some(1.8), Some(2.5)),
            rate(Spark, WstEth, Some(0.05), Some(0.3)),
            rate(Spark, WeEth, Some(0.0), None),
            rate(Spark, DAI, Some(5.0), Some(5.5)),
            rate(Spark, USDC, Some(4.0), Some(5.5)),
            // ── Compound V3 (collateral earns nothing) ──
            rate(CompoundV3, USDC, Some(4.8), Some(6.2)),
            rate(CompoundV3, WETH, Some(1.9), Some(2.7)),
            rate(CompoundV3, WstEth, Some(0.0), None),
            rate(CompoundV3, WeEth, Some(0.0), None),
        ])
    }
}
