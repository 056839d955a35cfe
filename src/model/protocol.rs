use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DeFi protocols a strategy block can route through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Lido liquid staking (ETH → stETH).
    Lido,
    /// ether.fi liquid restaking (ETH → eETH).
    EtherFi,
    /// Rocket Pool (ETH → rETH).
    RocketPool,
    /// Aave V3 Pool.
    AaveV3,
    /// Spark (Aave V3 fork, same Pool ABI).
    Spark,
    /// Compound V3 (Comet).
    CompoundV3,
    /// Uniswap V3 SwapRouter02.
    UniswapV3,
}

/// What kind of action a protocol supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolCategory {
    Staking,
    Lending,
    Dex,
}

impl Protocol {
    pub fn category(&self) -> ProtocolCategory {
        match self {
            Protocol::Lido | Protocol::EtherFi | Protocol::RocketPool => ProtocolCategory::Staking,
            Protocol::AaveV3 | Protocol::Spark | Protocol::CompoundV3 => ProtocolCategory::Lending,
            Protocol::UniswapV3 => ProtocolCategory::Dex,
        }
    }

    /// Stable snake_case key, matching the JSON representation.
    pub fn key(&self) -> &'static str {
        match self {
            Protocol::Lido => "lido",
            Protocol::EtherFi => "ether_fi",
            Protocol::RocketPool => "rocket_pool",
            Protocol::AaveV3 => "aave_v3",
            Protocol::Spark => "spark",
            Protocol::CompoundV3 => "compound_v3",
            Protocol::UniswapV3 => "uniswap_v3",
        }
    }

    /// DefiLlama yields project slug.
    pub fn defillama_slug(&self) -> &'static str {
        match self {
            Protocol::Lido => "lido",
            Protocol::EtherFi => "ether.fi-stake",
            Protocol::RocketPool => "rocket-pool",
            Protocol::AaveV3 => "aave-v3",
            Protocol::Spark => "sparklend",
            Protocol::CompoundV3 => "compound-v3",
            Protocol::UniswapV3 => "uniswap-v3",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
