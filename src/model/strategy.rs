use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::block::Block;
use super::edge::Edge;

/// A named strategy: typed blocks connected by percentage-weighted flow
/// edges. Always handed to the engine as a full snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Strategy {
    /// Human-readable name for this strategy.
    #[serde(default)]
    pub name: String,
    /// Optional description of the strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The blocks (actions) in this strategy.
    pub blocks: Vec<Block>,
    /// The edges (value flows) connecting blocks.
    pub edges: Vec<Edge>,
}

impl Strategy {
    pub fn new(blocks: Vec<Block>, edges: Vec<Edge>) -> Self {
        Strategy {
            name: String::new(),
            description: None,
            blocks,
            edges,
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// The unique input block, if exactly one exists.
    pub fn input_block(&self) -> Option<&Block> {
        let mut inputs = self.blocks.iter().filter(|b| b.is_input());
        match (inputs.next(), inputs.next()) {
            (Some(block), None) => Some(block),
            _ => None,
        }
    }

    pub fn block_map(&self) -> HashMap<&str, &Block> {
        self.blocks.iter().map(|b| (b.id.as_str(), b)).collect()
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }
}
