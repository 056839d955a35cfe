use std::collections::HashSet;

use crate::model::Strategy;

use super::ValidationError;

/// Check that exactly one input block exists.
pub fn check_input_count(strategy: &Strategy) -> Vec<ValidationError> {
    let count = strategy.blocks.iter().filter(|b| b.is_input()).count();
    if count == 1 {
        Vec::new()
    } else {
        vec![ValidationError::MissingInput { count }]
    }
}

/// Check that all block IDs are unique.
pub fn check_duplicate_ids(strategy: &Strategy) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for block in &strategy.blocks {
        if !seen.insert(block.id()) {
            errors.push(ValidationError::DuplicateBlockId {
                block_id: block.id.clone(),
            });
        }
    }

    errors
}

/// Check that every edge references existing blocks and carries a sane share.
/// The input block only emits; nothing may flow into it.
pub fn check_edge_references(strategy: &Strategy) -> Vec<ValidationError> {
    let block_ids: HashSet<&str> = strategy.blocks.iter().map(|b| b.id()).collect();
    let input_ids: HashSet<&str> = strategy
        .blocks
        .iter()
        .filter(|b| b.is_input())
        .map(|b| b.id())
        .collect();
    let mut errors = Vec::new();

    for edge in &strategy.edges {
        for end in [&edge.source, &edge.target] {
            if !block_ids.contains(end.as_str()) {
                errors.push(ValidationError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    block_id: end.clone(),
                });
            }
        }
        if input_ids.contains(edge.target.as_str()) {
            errors.push(ValidationError::EdgeIntoInput {
                edge_id: edge.id.clone(),
                block_id: edge.target.clone(),
            });
        }
        if !(edge.flow_percent > 0.0 && edge.flow_percent <= 100.0) {
            errors.push(ValidationError::InvalidFlowPercent {
                edge_id: edge.id.clone(),
                value: edge.flow_percent,
            });
        }
    }

    errors
}
