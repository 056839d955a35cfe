//! Transaction plans: the ordered on-chain calls that execute a strategy.
//!
//! Building a plan is the only part of the engine that touches the network
//! (gas prices, allowances); every read is bounded by a timeout.

pub mod approvals;
pub mod batching;
pub mod builder;
pub mod encode;
pub mod evm;
pub mod gas;
pub mod session;

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::RouteIncompatibility;
use crate::model::Asset;
use crate::validate::ValidationError;

pub use approvals::{AllowanceReader, ApprovalCheckResult, ApprovalError, check_approvals};
pub use batching::{BatchingSummary, apply_batching};
pub use builder::{PlanContext, build_plan};
pub use encode::{AbiEncoder, CallEncoder, ContractBook, EncodeError};
pub use gas::{GasOracle, StaticGasOracle};
pub use session::PlanSessions;

// ── Plan types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Approve,
    Stake,
    Supply,
    Borrow,
    Swap,
    Wrap,
    Unwrap,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Approve => "approve",
            StepAction::Stake => "stake",
            StepAction::Supply => "supply",
            StepAction::Borrow => "borrow",
            StepAction::Swap => "swap",
            StepAction::Wrap => "wrap",
            StepAction::Unwrap => "unwrap",
        }
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token movement attached to a step. `address` is `None` for native ETH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub asset: Asset,
    pub address: Option<Address>,
    pub amount: U256,
}

/// Allowance snapshot for an approve step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    pub required: U256,
    pub current_allowance: Option<U256>,
    pub can_skip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Position of a step inside a multicall batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub batch_id: String,
    pub index: usize,
    pub size: usize,
}

/// One on-chain call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub action: StepAction,
    pub protocol: String,
    pub chain_id: u64,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<TokenAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<TokenAmount>,
    /// Contract that pulls `token_in` (and therefore needs an allowance).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spender: Option<Address>,
    pub estimated_gas: u64,
    pub source_block_id: String,
    /// Loop iteration that produced this step (0 outside loops).
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_info: Option<BatchInfo>,
}

impl Step {
    pub fn is_approve(&self) -> bool {
        self.action == StepAction::Approve
    }

    /// Approve steps flagged skippable by an allowance check.
    pub fn can_skip(&self) -> bool {
        self.approval_status.as_ref().is_some_and(|s| s.can_skip)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainGasPrice {
    pub chain_id: u64,
    pub wei: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub id: String,
    pub wallet: Address,
    pub strategy_name: String,
    pub input_asset: Asset,
    pub input_amount: U256,
    pub steps: Vec<Step>,
    pub estimated_total_gas: u64,
    /// Gas cost in USD over the chains whose gas price resolved.
    pub estimated_total_gas_usd: f64,
    /// ETH price the plan was priced with.
    pub eth_price: f64,
    pub gas_prices: Vec<ChainGasPrice>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Expired,
}

impl TransactionPlan {
    /// Plans past `expires_at` must be rebuilt, not reused.
    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        if now >= self.expires_at {
            Freshness::Expired
        } else {
            Freshness::Fresh
        }
    }

    pub fn gas_price(&self, chain_id: u64) -> Option<u128> {
        self.gas_prices
            .iter()
            .find(|g| g.chain_id == chain_id)
            .map(|g| g.wei)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// A built plan with its allowance check and batching applied.
#[derive(Debug, Clone, Serialize)]
pub struct PlanBundle {
    pub plan: TransactionPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approvals: Option<ApprovalCheckResult>,
    pub batching: BatchingSummary,
}

impl PlanBundle {
    /// Stamp `approvals` (if any) onto `plan` and batch it.
    pub fn assemble(plan: TransactionPlan, approvals: Option<ApprovalCheckResult>) -> Self {
        let check = approvals
            .clone()
            .unwrap_or_else(|| ApprovalCheckResult::unchecked(&plan));
        let (plan, batching) = apply_batching(&plan, &check);
        PlanBundle {
            plan,
            approvals,
            batching,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("strategy failed validation: {}", join(.0))]
    InvalidStrategy(Vec<ValidationError>),

    #[error("route has incompatible edges: {}", join(.0.iter().map(|i| &i.reason)))]
    Incompatible(Vec<RouteIncompatibility>),

    #[error("input block holds {expected}, plan requested {requested}")]
    InputMismatch { expected: Asset, requested: Asset },

    #[error("input amount must be greater than zero")]
    ZeroAmount,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("superseded by a newer plan build for this wallet")]
    Superseded,
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
