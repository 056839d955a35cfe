mod graph;
mod params;
mod references;

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::model::Strategy;

/// Structural problems found in a strategy graph. Always returned as data,
/// never raised.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Expected exactly one input block, found {count}")]
    MissingInput { count: usize },

    #[error("Block `{block_id}` has invalid `{field}`: {reason}")]
    InvalidParams {
        block_id: String,
        field: String,
        reason: String,
    },

    #[error("Duplicate block ID `{block_id}`")]
    DuplicateBlockId { block_id: String },

    #[error("Edge `{edge_id}` references unknown block `{block_id}`")]
    DanglingEdge { edge_id: String, block_id: String },

    #[error("Edge `{edge_id}` has flow_percent {value} outside (0, 100]")]
    InvalidFlowPercent { edge_id: String, value: f64 },

    #[error("Edge `{edge_id}` flows back into input block `{block_id}`")]
    EdgeIntoInput { edge_id: String, block_id: String },

    #[error("Self-loop on block `{block_id}`")]
    SelfLoop { block_id: String },

    #[error("Cycle not bounded by a loop block: {}", block_ids.join(", "))]
    IllegalCycle { block_ids: Vec<String> },

    #[error("Loop blocks {} share one cycle (nested loops are not supported)", loop_ids.join(", "))]
    NestedLoop { loop_ids: Vec<String> },

    #[error("Outgoing flow of block `{block_id}` sums to {sum}% (more than 100%)")]
    OverAllocatedFlow { block_id: String, sum: f64 },

    #[error("Block `{block_id}` is not reachable from the input block")]
    UnreachableBlock { block_id: String },
}

impl ValidationError {
    /// Errors that leave no well-defined execution order. The simulator
    /// returns an empty result when any of these are present.
    pub fn prevents_execution(&self) -> bool {
        matches!(
            self,
            ValidationError::MissingInput { .. }
                | ValidationError::DuplicateBlockId { .. }
                | ValidationError::SelfLoop { .. }
                | ValidationError::IllegalCycle { .. }
                | ValidationError::NestedLoop { .. }
        )
    }
}

/// Outcome of [`validate`]: every error found, in check order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn prevents_execution(&self) -> bool {
        self.errors.iter().any(ValidationError::prevents_execution)
    }
}

/// Validate a strategy, collecting all errors.
pub fn validate(strategy: &Strategy) -> ValidationReport {
    let mut errors = Vec::new();

    errors.extend(references::check_input_count(strategy));
    errors.extend(params::check_params(strategy));
    errors.extend(references::check_duplicate_ids(strategy));
    errors.extend(references::check_edge_references(strategy));
    errors.extend(graph::check_cycles(strategy));
    errors.extend(graph::check_flow_allocation(strategy));
    errors.extend(graph::check_reachability(strategy));

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Read a strategy from a JSON file.
pub fn load_strategy(path: &Path) -> anyhow::Result<Strategy> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading strategy {}", path.display()))?;
    let strategy: Strategy = serde_json::from_str(&contents)
        .with_context(|| format!("parsing strategy {}", path.display()))?;
    Ok(strategy)
}

/// CLI entry point for the `validate` subcommand.
pub fn run(path: &Path) -> anyhow::Result<()> {
    let strategy = load_strategy(path)?;
    let report = validate(&strategy);
    if report.is_valid {
        println!(
            "Strategy '{}' is valid. {} blocks, {} edges.",
            strategy.name,
            strategy.blocks.len(),
            strategy.edges.len()
        );
        return Ok(());
    }

    eprintln!("Validation failed with {} error(s):", report.errors.len());
    for (i, e) in report.errors.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, e);
    }
    std::process::exit(1);
}
