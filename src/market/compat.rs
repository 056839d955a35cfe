use std::collections::{HashMap, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Asset, Protocol, WrapStep};

/// Receipt token a staking protocol mints for a deposited asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StakeReceipt {
    pub protocol: Protocol,
    pub deposit: Asset,
    pub receipt: Asset,
}

/// A registered wrapper contract converting between two assets on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Wrapper {
    pub chain_id: u64,
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub is_wrap: bool,
    /// Contract address (0x-prefixed hex).
    pub contract: String,
}

impl Wrapper {
    pub fn to_step(&self) -> WrapStep {
        WrapStep {
            is_wrap: self.is_wrap,
            from_asset: self.from_asset,
            to_asset: self.to_asset,
            wrapper_contract: self.contract.clone(),
        }
    }
}

/// Protocol/asset compatibility metadata used by the route optimizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Compatibility {
    #[serde(default)]
    pub receipts: Vec<StakeReceipt>,
    #[serde(default)]
    pub wrappers: Vec<Wrapper>,
}

impl Compatibility {
    /// Receipt token for staking `deposit` with `protocol`.
    pub fn stake_receipt(&self, protocol: Protocol, deposit: Asset) -> Option<Asset> {
        self.receipts
            .iter()
            .find(|r| r.protocol == protocol && r.deposit == deposit)
            .map(|r| r.receipt)
    }

    /// Shortest chain of wrappers converting `from` into `to` on `chain_id`.
    /// Breadth-first over the registry in declaration order, so equal-length
    /// paths resolve deterministically. Empty when `from == to`; `None`
    /// when unreachable.
    pub fn wrapper_path(&self, chain_id: u64, from: Asset, to: Asset) -> Option<Vec<&Wrapper>> {
        if from == to {
            return Some(Vec::new());
        }

        let on_chain: Vec<&Wrapper> = self
            .wrappers
            .iter()
            .filter(|w| w.chain_id == chain_id)
            .collect();

        let mut came_from: HashMap<Asset, &Wrapper> = HashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(asset) = queue.pop_front() {
            for wrapper in on_chain.iter().filter(|w| w.from_asset == asset) {
                let next = wrapper.to_asset;
                if next == from || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, wrapper);
                if next == to {
                    let mut path = Vec::new();
                    let mut cursor = to;
                    while cursor != from {
                        let hop = came_from[&cursor];
                        path.push(hop);
                        cursor = hop.from_asset;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Mainnet and L2 reference metadata.
    pub fn reference() -> Self {
        use Asset::*;

        let receipt = |protocol, deposit, receipt| StakeReceipt {
            protocol,
            deposit,
            receipt,
        };

        let mut wrappers = Vec::new();
        let mut pair = |chain_id: u64, canonical: Asset, wrapped: Asset, contract: &str| {
            wrappers.push(Wrapper {
                chain_id,
                from_asset: canonical,
                to_asset: wrapped,
                is_wrap: true,
                contract: contract.to_string(),
            });
            wrappers.push(Wrapper {
                chain_id,
                from_asset: wrapped,
                to_asset: canonical,
                is_wrap: false,
                contract: contract.to_string(),
            });
        };

        // ── Ethereum ──
        pair(1, EEth, WeEth, "0xCd5fE23C85820F7B72D0926FC9b05b43E359b7ee");
        pair(1, StEth, WstEth, "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0");
        pair(1, ETH, WETH, "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
        // ── Optimism ──
        pair(10, ETH, WETH, "0x4200000000000000000000000000000000000006");
        // ── Base ──
        pair(8453, ETH, WETH, "0x4200000000000000000000000000000000000006");
        // ── Arbitrum ──
        pair(42161, ETH, WETH, "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1");

        Compatibility {
            receipts: vec![
                receipt(Protocol::Lido, ETH, StEth),
                receipt(Protocol::EtherFi, ETH, EEth),
                receipt(Protocol::RocketPool, ETH, REth),
            ],
            wrappers,
        }
    }
}
