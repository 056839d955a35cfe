use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::protocol::Protocol;
use super::wrap::WrapStep;

/// A unique identifier for a block within a strategy.
pub type BlockId = String;

/// Upper bound on loop unrolling.
pub const MAX_LOOP_ITERATIONS: u32 = 10;

/// A strategy block: one DeFi action node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Block {
    /// Unique identifier for this block.
    pub id: BlockId,
    /// EVM chain the action executes on.
    pub chain_id: u64,
    /// Type-specific parameters, discriminated by the "type" field in JSON.
    #[serde(flatten)]
    pub params: BlockParams,
}

/// Block parameters keyed by block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockParams {
    /// Source of funds: the notional amount the strategy starts with.
    Input {
        asset: Asset,
        /// Amount in whole token units (e.g. 10.0 ETH).
        amount: f64,
    },
    /// Liquid staking deposit.
    Stake {
        protocol: Protocol,
        /// Asset deposited into the staking protocol.
        asset: Asset,
    },
    /// Supply to a lending market (also serves as borrow collateral).
    Lend { protocol: Protocol, asset: Asset },
    /// Borrow against collateral supplied upstream.
    Borrow {
        protocol: Protocol,
        /// Asset borrowed.
        asset: Asset,
        /// Loan-to-value applied to the inflowing collateral value (0.0 - 1.0).
        target_ltv: f64,
    },
    /// DEX swap into `to_asset`.
    Swap {
        protocol: Protocol,
        to_asset: Asset,
        /// Slippage override in basis points. Falls back to market data.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slippage_bps: Option<f64>,
    },
    /// Bounded repetition of the cycle this block closes.
    Loop { iterations: u32 },
    /// Synthetic wrap/unwrap step inserted by the route optimizer.
    AutoWrap(WrapStep),
}

impl Block {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.params.type_name()
    }

    pub fn protocol(&self) -> Option<Protocol> {
        match &self.params {
            BlockParams::Stake { protocol, .. }
            | BlockParams::Lend { protocol, .. }
            | BlockParams::Borrow { protocol, .. }
            | BlockParams::Swap { protocol, .. } => Some(*protocol),
            BlockParams::Input { .. } | BlockParams::Loop { .. } | BlockParams::AutoWrap(_) => {
                None
            }
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.params, BlockParams::Input { .. })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.params, BlockParams::Loop { .. })
    }

    /// The asset this block expects to receive. `None` means the block
    /// accepts whatever flows in (borrow takes collateral of any kind,
    /// swaps and loops convert or pass through).
    pub fn expected_input(&self) -> Option<Asset> {
        match &self.params {
            BlockParams::Stake { asset, .. } | BlockParams::Lend { asset, .. } => Some(*asset),
            BlockParams::AutoWrap(wrap) => Some(wrap.from_asset),
            BlockParams::Input { .. }
            | BlockParams::Borrow { .. }
            | BlockParams::Swap { .. }
            | BlockParams::Loop { .. } => None,
        }
    }

    /// Short label for display (type + key info).
    pub fn label(&self) -> String {
        match &self.params {
            BlockParams::Input { asset, amount } => format!("input({amount} {asset})"),
            BlockParams::Stake { protocol, asset } => format!("stake({asset} on {protocol})"),
            BlockParams::Lend { protocol, asset } => format!("lend({asset} on {protocol})"),
            BlockParams::Borrow {
                protocol,
                asset,
                target_ltv,
            } => format!(
                "borrow({asset} on {protocol} @ {:.0}% LTV)",
                target_ltv * 100.0
            ),
            BlockParams::Swap {
                protocol, to_asset, ..
            } => format!("swap(->{to_asset} via {protocol})"),
            BlockParams::Loop { iterations } => format!("loop(x{iterations})"),
            BlockParams::AutoWrap(wrap) => format!("auto-wrap({})", wrap.label()),
        }
    }
}

impl BlockParams {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockParams::Input { .. } => "input",
            BlockParams::Stake { .. } => "stake",
            BlockParams::Lend { .. } => "lend",
            BlockParams::Borrow { .. } => "borrow",
            BlockParams::Swap { .. } => "swap",
            BlockParams::Loop { .. } => "loop",
            BlockParams::AutoWrap(_) => "auto-wrap",
        }
    }
}
