use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::evm::{self, IERC20};
use super::{Freshness, TransactionPlan};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("plan {plan_id} expired at {expires_at}; rebuild it before checking approvals")]
    PlanExpired {
        plan_id: String,
        expires_at: DateTime<Utc>,
    },
}

/// Reads current ERC-20 allowances.
#[async_trait]
pub trait AllowanceReader: Send + Sync {
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> anyhow::Result<U256>;
}

/// `allowance(owner, spender)` over a per-chain RPC endpoint.
#[derive(Debug, Clone, Default)]
pub struct RpcAllowanceReader {
    endpoints: HashMap<u64, String>,
}

impl RpcAllowanceReader {
    pub fn new(endpoints: HashMap<u64, String>) -> Self {
        RpcAllowanceReader { endpoints }
    }
}

#[async_trait]
impl AllowanceReader for RpcAllowanceReader {
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> anyhow::Result<U256> {
        let url = self
            .endpoints
            .get(&chain_id)
            .with_context(|| format!("no RPC endpoint configured for chain {chain_id}"))?;
        let provider = evm::read_provider(url)?;
        let erc20 = IERC20::new(token, provider);
        let allowance = erc20
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance() failed for {}", evm::short_addr(&token)))?;
        Ok(allowance)
    }
}

// ── Results ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    pub step_id: String,
    pub chain_id: u64,
    pub token: Address,
    pub spender: Address,
    pub required: U256,
    pub current_allowance: Option<U256>,
    pub can_skip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalCheckResult {
    pub plan_id: String,
    /// Owner the allowances were read for.
    pub wallet: Address,
    pub entries: Vec<AllowanceEntry>,
    pub skippable_step_ids: Vec<String>,
    pub failed_step_ids: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl ApprovalCheckResult {
    /// A result with no allowance reads: every approve step stays.
    pub fn unchecked(plan: &TransactionPlan) -> Self {
        ApprovalCheckResult {
            plan_id: plan.id.clone(),
            wallet: plan.wallet,
            entries: Vec::new(),
            skippable_step_ids: Vec::new(),
            failed_step_ids: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    /// Whether this result was taken for `plan` and its wallet.
    pub fn applies_to(&self, plan: &TransactionPlan) -> bool {
        self.plan_id == plan.id && self.wallet == plan.wallet
    }

    pub fn entry(&self, step_id: &str) -> Option<&AllowanceEntry> {
        self.entries.iter().find(|e| e.step_id == step_id)
    }
}

type PairKey = (u64, Address, Address);

/// Check which approve steps `wallet` can skip.
///
/// One read per distinct (chain, token, spender), all concurrent and each
/// bounded by `timeout`. A failed read marks only its own entries. Within a
/// pair, allowance used by earlier skipped approvals is deducted before the
/// next one is judged; a non-skipped approve resets the pair.
pub async fn check_approvals(
    plan: &TransactionPlan,
    wallet: Address,
    reader: Arc<dyn AllowanceReader>,
    timeout: Duration,
) -> Result<ApprovalCheckResult, ApprovalError> {
    let now = Utc::now();
    if plan.freshness(now) == Freshness::Expired {
        return Err(ApprovalError::PlanExpired {
            plan_id: plan.id.clone(),
            expires_at: plan.expires_at,
        });
    }
    if wallet != plan.wallet {
        warn!(
            plan_id = %plan.id,
            wallet = %evm::short_addr(&wallet),
            plan_wallet = %evm::short_addr(&plan.wallet),
            "checking allowances for a wallet other than the plan's"
        );
    }

    // (step id, pair, required) in plan order
    let approvals: Vec<(&str, PairKey, U256)> = plan
        .steps
        .iter()
        .filter(|s| s.is_approve())
        .filter_map(|s| {
            let spender = s.spender?;
            let required = s.token_in.as_ref().map_or(U256::ZERO, |t| t.amount);
            Some((s.id.as_str(), (s.chain_id, s.to, spender), required))
        })
        .collect();

    let mut pairs: Vec<PairKey> = approvals.iter().map(|(_, pair, _)| *pair).collect();
    pairs.sort();
    pairs.dedup();

    let mut reads = JoinSet::new();
    for pair in pairs {
        let reader = reader.clone();
        reads.spawn(async move {
            let (chain_id, token, spender) = pair;
            let result =
                tokio::time::timeout(timeout, reader.allowance(chain_id, token, wallet, spender))
                    .await;
            let outcome = match result {
                Ok(Ok(allowance)) => Ok(allowance),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(_) => Err(format!("allowance read timed out after {}ms", timeout.as_millis())),
            };
            (pair, outcome)
        });
    }

    let mut allowances: HashMap<PairKey, Result<U256, String>> = HashMap::new();
    while let Some(joined) = reads.join_next().await {
        match joined {
            Ok((pair, outcome)) => {
                if let Err(e) = &outcome {
                    warn!(
                        chain_id = pair.0,
                        token = %evm::short_addr(&pair.1),
                        error = %e,
                        "allowance read failed"
                    );
                }
                allowances.insert(pair, outcome);
            }
            Err(e) => warn!(error = %e, "allowance read task failed"),
        }
    }

    let mut remaining: HashMap<PairKey, U256> = HashMap::new();
    let mut entries = Vec::with_capacity(approvals.len());
    let mut skippable_step_ids = Vec::new();
    let mut failed_step_ids = Vec::new();

    for (step_id, pair, required) in approvals {
        let (chain_id, token, spender) = pair;
        let mut entry = AllowanceEntry {
            step_id: step_id.to_string(),
            chain_id,
            token,
            spender,
            required,
            current_allowance: None,
            can_skip: false,
            error: None,
        };

        match allowances.get(&pair) {
            Some(Ok(allowance)) => {
                entry.current_allowance = Some(*allowance);
                let left = remaining.entry(pair).or_insert(*allowance);
                if *left >= required {
                    *left -= required;
                    entry.can_skip = true;
                    skippable_step_ids.push(entry.step_id.clone());
                } else {
                    // This approve executes and overwrites the allowance,
                    // which the following call then consumes.
                    *left = U256::ZERO;
                }
            }
            Some(Err(e)) => {
                entry.error = Some(e.clone());
                failed_step_ids.push(entry.step_id.clone());
            }
            None => {
                entry.error = Some("allowance read did not complete".to_string());
                failed_step_ids.push(entry.step_id.clone());
            }
        }
        entries.push(entry);
    }

    debug!(
        plan_id = %plan.id,
        checked = entries.len(),
        skippable = skippable_step_ids.len(),
        failed = failed_step_ids.len(),
        "approvals checked"
    );

    Ok(ApprovalCheckResult {
        plan_id: plan.id.clone(),
        wallet,
        entries,
        skippable_step_ids,
        failed_step_ids,
        checked_at: now,
    })
}
