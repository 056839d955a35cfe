use std::collections::{HashMap, HashSet, VecDeque};

use crate::engine::topo;
use crate::model::Strategy;

use super::ValidationError;

/// Cycle checks: self-loops, cycles without a loop block, and cycles that
/// stay cyclic once the loop block's back edges are removed.
pub fn check_cycles(strategy: &Strategy) -> Vec<ValidationError> {
    match topo::execution_order(strategy) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

/// Outgoing `flow_percent` of each block must not exceed 100.
pub fn check_flow_allocation(strategy: &Strategy) -> Vec<ValidationError> {
    let mut sums: Vec<(&str, f64)> = Vec::new();
    for edge in &strategy.edges {
        match sums.iter_mut().find(|(id, _)| *id == edge.source) {
            Some((_, sum)) => *sum += edge.flow_percent,
            None => sums.push((edge.source.as_str(), edge.flow_percent)),
        }
    }

    sums.into_iter()
        // float noise from e.g. 33.3 + 33.3 + 33.4
        .filter(|(_, sum)| *sum > 100.0 + 1e-9)
        .map(|(id, sum)| ValidationError::OverAllocatedFlow {
            block_id: id.to_string(),
            sum,
        })
        .collect()
}

/// Every block must be reachable from the unique input block. Skipped when
/// the input count is wrong; that is reported separately.
pub fn check_reachability(strategy: &Strategy) -> Vec<ValidationError> {
    let Some(input) = strategy.input_block() else {
        return Vec::new();
    };

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &strategy.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut seen: HashSet<&str> = HashSet::from([input.id()]);
    let mut queue = VecDeque::from([input.id()]);
    while let Some(id) = queue.pop_front() {
        for &next in adjacency.get(id).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let mut reported = HashSet::new();
    strategy
        .blocks
        .iter()
        .filter(|b| !seen.contains(b.id()) && reported.insert(b.id()))
        .map(|b| ValidationError::UnreachableBlock {
            block_id: b.id.clone(),
        })
        .collect()
}
