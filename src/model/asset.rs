use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A fungible token role inside a strategy (not a contract address).
/// Contract resolution happens when a plan is built.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Asset {
    ETH,
    WETH,
    #[serde(rename = "stETH")]
    StEth,
    #[serde(rename = "wstETH")]
    WstEth,
    #[serde(rename = "eETH")]
    EEth,
    #[serde(rename = "weETH")]
    WeEth,
    #[serde(rename = "rETH")]
    REth,
    USDC,
    USDT,
    DAI,
}

impl Asset {
    pub const ALL: [Asset; 10] = [
        Asset::ETH,
        Asset::WETH,
        Asset::StEth,
        Asset::WstEth,
        Asset::EEth,
        Asset::WeEth,
        Asset::REth,
        Asset::USDC,
        Asset::USDT,
        Asset::DAI,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::ETH => "ETH",
            Asset::WETH => "WETH",
            Asset::StEth => "stETH",
            Asset::WstEth => "wstETH",
            Asset::EEth => "eETH",
            Asset::WeEth => "weETH",
            Asset::REth => "rETH",
            Asset::USDC => "USDC",
            Asset::USDT => "USDT",
            Asset::DAI => "DAI",
        }
    }

    /// Case-insensitive symbol lookup.
    pub fn from_symbol(symbol: &str) -> Option<Asset> {
        Asset::ALL
            .iter()
            .copied()
            .find(|a| a.symbol().eq_ignore_ascii_case(symbol))
    }

    /// ETH and its liquid staking / wrapped derivatives.
    /// These are valued 1:1 with ETH in the simulation.
    pub fn is_eth_like(&self) -> bool {
        !self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Asset::USDC | Asset::USDT | Asset::DAI)
    }

    /// The chain's native gas token; spent via `msg.value`, never approved.
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::ETH)
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Asset::USDC | Asset::USDT => 6,
            _ => 18,
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
