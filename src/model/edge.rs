use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::block::BlockId;

/// A unique identifier for an edge within a strategy.
pub type EdgeId = String;

/// A directed flow of value between two blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// Upstream block ID.
    pub source: BlockId,
    /// Downstream block ID.
    pub target: BlockId,
    /// Share of the source's output routed along this edge (0 < p <= 100).
    pub flow_percent: f64,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<BlockId>,
        target: impl Into<BlockId>,
        flow_percent: f64,
    ) -> Self {
        Edge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            flow_percent,
        }
    }

    /// `flow_percent` as a fraction.
    pub fn share(&self) -> f64 {
        self.flow_percent / 100.0
    }
}
