use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::Asset;

use super::approvals::ApprovalCheckResult;
use super::gas::{self, BASE_TX_GAS};
use super::{ApprovalStatus, BatchInfo, Freshness, Step, TransactionPlan};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchingSummary {
    pub batches: usize,
    pub steps_batched: usize,
    pub transactions_before: usize,
    pub transactions_after: usize,
    pub estimated_gas_saved: u64,
    pub estimated_gas_saved_usd: f64,
}

/// Stamp approval results onto the plan and group consecutive steps into
/// multicall batches.
///
/// A check taken for another plan or wallet is ignored, so every approve
/// stays. An expired plan is still batched but carries a warning.
///
/// A batch extends while the next non-skipped step stays on the same chain
/// and protocol and does not spend a token an earlier step of the batch
/// produced. Skippable approves are ignored by the scan. Every batch saves
/// one intrinsic transaction cost per step beyond the first.
pub fn apply_batching(
    plan: &TransactionPlan,
    check: &ApprovalCheckResult,
) -> (TransactionPlan, BatchingSummary) {
    let mut plan = plan.clone();
    if plan.freshness(Utc::now()) == Freshness::Expired {
        warn!(plan_id = %plan.id, "batching an expired plan");
        plan.warnings.push(format!(
            "Plan expired at {}; rebuild it before executing",
            plan.expires_at
        ));
    }

    let unchecked;
    let check = if check.applies_to(&plan) {
        check
    } else {
        warn!(
            plan_id = %plan.id,
            check_plan_id = %check.plan_id,
            "approval check belongs to another plan or wallet, ignoring it"
        );
        plan.warnings.push(format!(
            "Approval check {} / {} does not match this plan; no approvals skipped",
            check.plan_id, check.wallet
        ));
        unchecked = ApprovalCheckResult::unchecked(&plan);
        &unchecked
    };

    for step in plan.steps.iter_mut() {
        if let Some(entry) = check.entry(&step.id) {
            step.approval_status = Some(ApprovalStatus {
                required: entry.required,
                current_allowance: entry.current_allowance,
                can_skip: entry.can_skip,
                error: entry.error.clone(),
            });
        }
    }

    let live: Vec<usize> = (0..plan.steps.len())
        .filter(|&i| !plan.steps[i].can_skip())
        .collect();

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut produced: HashSet<Asset> = HashSet::new();
    for &i in &live {
        let step = &plan.steps[i];
        let extends = groups
            .last()
            .and_then(|g| g.last())
            .is_some_and(|&prev| joins(&plan.steps[prev], step, &produced));
        if !extends {
            groups.push(Vec::new());
            produced.clear();
        }
        if let Some(token) = &step.token_out {
            produced.insert(token.asset);
        }
        if let Some(group) = groups.last_mut() {
            group.push(i);
        }
    }

    let mut summary = BatchingSummary {
        transactions_before: live.len(),
        transactions_after: groups.len(),
        ..BatchingSummary::default()
    };

    for group in groups.iter().filter(|g| g.len() > 1) {
        summary.batches += 1;
        summary.steps_batched += group.len();
        let batch_id = format!("batch-{}", summary.batches);
        let saved = (group.len() as u64 - 1) * BASE_TX_GAS;
        summary.estimated_gas_saved += saved;

        let chain_id = plan.steps[group[0]].chain_id;
        if let Some(wei) = plan.gas_price(chain_id) {
            summary.estimated_gas_saved_usd += gas::gas_cost_usd(saved, wei, plan.eth_price);
        }

        for (index, &i) in group.iter().enumerate() {
            plan.steps[i].batch_info = Some(BatchInfo {
                batch_id: batch_id.clone(),
                index,
                size: group.len(),
            });
        }
    }

    debug!(
        plan_id = %plan.id,
        batches = summary.batches,
        before = summary.transactions_before,
        after = summary.transactions_after,
        "batching applied"
    );
    (plan, summary)
}

fn joins(prev: &Step, next: &Step, produced: &HashSet<Asset>) -> bool {
    if prev.chain_id != next.chain_id || prev.protocol != next.protocol {
        return false;
    }
    let spends_produced = !next.is_approve()
        && next
            .token_in
            .as_ref()
            .is_some_and(|t| produced.contains(&t.asset));
    !spends_produced
}
