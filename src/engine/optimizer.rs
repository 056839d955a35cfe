use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::market::MarketData;
use crate::model::{Asset, Block, BlockParams, Edge, Strategy, WrapStep};

use super::topo::{self, ExecutionOrder};

/// Passes before the optimizer gives up on a chain of conversions.
pub const DEFAULT_MAX_PASSES: usize = 8;

/// An edge whose assets could not be reconciled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteIncompatibility {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeOutcome {
    pub strategy: Strategy,
    pub inserted_count: usize,
    pub incompatibilities: Vec<RouteIncompatibility>,
}

/// Insert auto-wrap blocks wherever an edge carries an asset its target
/// does not accept. Re-running on the result inserts nothing.
pub fn optimize(strategy: &Strategy, market: &MarketData) -> OptimizeOutcome {
    optimize_with(strategy, market, DEFAULT_MAX_PASSES)
}

pub fn optimize_with(
    strategy: &Strategy,
    market: &MarketData,
    max_passes: usize,
) -> OptimizeOutcome {
    let mut current = strategy.clone();
    let mut inserted_count = 0;

    for pass in 0..max_passes {
        let Ok(order) = topo::execution_order(&current) else {
            // Structural errors belong to the validator; leave the graph as is.
            warn!("strategy has no execution order, skipping route optimization");
            return OptimizeOutcome {
                strategy: current,
                inserted_count,
                incompatibilities: Vec::new(),
            };
        };

        let mismatches = find_mismatches(&current, &order, market);
        let mut inserted_this_pass = 0;
        let mut incompatibilities = Vec::new();

        for m in mismatches {
            let chain_id = current.blocks[m.source_idx].chain_id;
            let first_hop = market
                .wrapper_path(chain_id, m.from_asset, m.to_asset)
                .and_then(|path| path.first().map(|w| w.to_step()));

            match first_hop {
                Some(step) => {
                    splice_wrap(&mut current, m.edge_idx, chain_id, step);
                    inserted_this_pass += 1;
                }
                None => incompatibilities.push(m.incompatibility(
                    &current,
                    format!(
                        "no wrapper converts {} into {} on chain {chain_id}",
                        m.from_asset, m.to_asset
                    ),
                )),
            }
        }

        inserted_count += inserted_this_pass;
        if inserted_this_pass == 0 {
            debug!(passes = pass + 1, inserted_count, "route optimization converged");
            return OptimizeOutcome {
                strategy: current,
                inserted_count,
                incompatibilities,
            };
        }
    }

    // Cap reached while still inserting: report what is left.
    let incompatibilities = match topo::execution_order(&current) {
        Ok(order) => find_mismatches(&current, &order, market)
            .into_iter()
            .map(|m| {
                m.incompatibility(
                    &current,
                    format!("still incompatible after {max_passes} optimization passes"),
                )
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    warn!(
        max_passes,
        remaining = incompatibilities.len(),
        "route optimization hit its pass cap"
    );

    OptimizeOutcome {
        strategy: current,
        inserted_count,
        incompatibilities,
    }
}

/// Asset each block emits, in execution order. Blocks whose output cannot
/// be determined (unknown staking receipt, loop with unknown inflow) are
/// absent.
pub fn infer_output_assets(
    strategy: &Strategy,
    order: &ExecutionOrder,
    market: &MarketData,
) -> HashMap<String, Asset> {
    let blocks = strategy.block_map();
    let mut assets: HashMap<String, Asset> = HashMap::new();

    for id in order.flatten() {
        let Some(block) = blocks.get(id.as_str()) else {
            continue;
        };
        let output = match &block.params {
            BlockParams::Input { asset, .. } => Some(*asset),
            BlockParams::Stake { protocol, asset } => market.stake_receipt(*protocol, *asset),
            BlockParams::Lend { asset, .. } => Some(*asset),
            BlockParams::Borrow { asset, .. } => Some(*asset),
            BlockParams::Swap { to_asset, .. } => Some(*to_asset),
            BlockParams::AutoWrap(wrap) => Some(wrap.to_asset),
            BlockParams::Loop { .. } => strategy
                .incoming(&block.id)
                .find_map(|e| assets.get(&e.source).copied()),
        };
        if let Some(asset) = output {
            assets.insert(id, asset);
        }
    }

    assets
}

struct Mismatch {
    edge_idx: usize,
    source_idx: usize,
    from_asset: Asset,
    to_asset: Asset,
}

impl Mismatch {
    fn incompatibility(&self, strategy: &Strategy, reason: String) -> RouteIncompatibility {
        let edge = &strategy.edges[self.edge_idx];
        RouteIncompatibility {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            from_asset: self.from_asset,
            to_asset: self.to_asset,
            reason,
        }
    }
}

/// Edges whose carried asset differs from the target's expected input,
/// ordered by the source's position in the execution order.
fn find_mismatches(
    strategy: &Strategy,
    order: &ExecutionOrder,
    market: &MarketData,
) -> Vec<Mismatch> {
    let assets = infer_output_assets(strategy, order, market);
    let block_idx: HashMap<&str, usize> = strategy
        .blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id(), i))
        .collect();

    let mut mismatches = Vec::new();
    for id in order.flatten() {
        let Some(&source_idx) = block_idx.get(id.as_str()) else {
            continue;
        };
        let Some(&from_asset) = assets.get(&id) else {
            continue;
        };
        for (edge_idx, edge) in strategy.edges.iter().enumerate() {
            if edge.source != id {
                continue;
            }
            let Some(expected) = block_idx
                .get(edge.target.as_str())
                .and_then(|&t| strategy.blocks[t].expected_input())
            else {
                continue;
            };
            if expected != from_asset {
                mismatches.push(Mismatch {
                    edge_idx,
                    source_idx,
                    from_asset,
                    to_asset: expected,
                });
            }
        }
    }
    mismatches
}

/// Replace edge `(u, v)` with `(u, w)` and `(w, v)` around a new auto-wrap
/// block `w`. `(u, w)` keeps the original edge id and share; the wrap
/// block forwards all of its output to `v`.
fn splice_wrap(strategy: &mut Strategy, edge_idx: usize, chain_id: u64, step: WrapStep) {
    let block_ids: HashSet<&str> = strategy.blocks.iter().map(|b| b.id()).collect();
    let edge_ids: HashSet<&str> = strategy.edges.iter().map(|e| e.id.as_str()).collect();

    let original = strategy.edges[edge_idx].clone();
    let wrap_id = unique_id(&format!("wrap-{}-{}", original.source, original.target), &block_ids);
    let tail_id = unique_id(&format!("{}/wrap", original.id), &edge_ids);

    debug!(
        edge = %original.id,
        block = %wrap_id,
        from = %step.from_asset,
        to = %step.to_asset,
        "inserting auto-wrap"
    );

    strategy.blocks.push(Block {
        id: wrap_id.clone(),
        chain_id,
        params: BlockParams::AutoWrap(step),
    });
    strategy.edges[edge_idx].target = wrap_id.clone();
    // Appended so indices of pending mismatches stay valid
    strategy.edges.push(Edge::new(
        tail_id,
        wrap_id,
        original.target,
        100.0,
    ));
}

fn unique_id(base: &str, taken: &HashSet<&str>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
