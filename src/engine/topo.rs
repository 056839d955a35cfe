use std::collections::{HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, Topo};

use crate::model::{BlockId, BlockParams, EdgeId, Strategy};
use crate::validate::ValidationError;

/// One unit of execution: a single block, or a loop component that is
/// unrolled as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Block(BlockId),
    Loop(LoopStage),
}

/// A strongly connected component closed by exactly one loop block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStage {
    pub loop_id: BlockId,
    pub iterations: u32,
    /// Component members in body order. The loop block is always last.
    pub body: Vec<BlockId>,
    /// Edges leading from the loop block back into the body.
    pub back_edges: Vec<EdgeId>,
}

impl LoopStage {
    pub fn contains(&self, block_id: &str) -> bool {
        self.body.iter().any(|id| id == block_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionOrder {
    pub stages: Vec<Stage>,
}

impl ExecutionOrder {
    /// Every block once, loop bodies expanded in body order.
    pub fn flatten(&self) -> Vec<BlockId> {
        let mut order = Vec::new();
        for stage in &self.stages {
            match stage {
                Stage::Block(id) => order.push(id.clone()),
                Stage::Loop(l) => order.extend(l.body.iter().cloned()),
            }
        }
        order
    }

    pub fn is_back_edge(&self, edge_id: &str) -> bool {
        self.stages.iter().any(|s| match s {
            Stage::Loop(l) => l.back_edges.iter().any(|e| e == edge_id),
            Stage::Block(_) => false,
        })
    }
}

/// Compute the execution order of a strategy.
///
/// Strongly connected components are contracted and ordered topologically;
/// each cyclic component must hold exactly one loop block, and removing that
/// block's edges back into the component must leave the body acyclic.
/// Edges touching unknown blocks are ignored here (reported by the validator).
pub fn execution_order(strategy: &Strategy) -> Result<ExecutionOrder, Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Edge weight = index into `strategy.edges`
    let mut graph = DiGraph::<&str, usize>::new();
    let mut index_map: HashMap<&str, NodeIndex> = HashMap::new();

    for block in &strategy.blocks {
        if !index_map.contains_key(block.id()) {
            let idx = graph.add_node(block.id());
            index_map.insert(block.id(), idx);
        }
    }

    for (i, edge) in strategy.edges.iter().enumerate() {
        if edge.source == edge.target {
            errors.push(ValidationError::SelfLoop {
                block_id: edge.source.clone(),
            });
            continue;
        }
        if let (Some(&from_idx), Some(&to_idx)) = (
            index_map.get(edge.source.as_str()),
            index_map.get(edge.target.as_str()),
        ) {
            graph.add_edge(from_idx, to_idx, i);
        }
    }

    // Components numbered by their first block so the order is deterministic
    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&graph)
        .into_iter()
        .map(|mut c| {
            c.sort();
            c
        })
        .collect();
    components.sort_by_key(|c| c[0]);

    let mut component_of = vec![0usize; graph.node_count()];
    for (ci, members) in components.iter().enumerate() {
        for n in members {
            component_of[n.index()] = ci;
        }
    }

    let mut condensed = DiGraph::<usize, ()>::with_capacity(components.len(), 0);
    for ci in 0..components.len() {
        condensed.add_node(ci);
    }
    for e in graph.edge_references() {
        let (a, b) = (
            component_of[e.source().index()],
            component_of[e.target().index()],
        );
        if a != b {
            condensed.update_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
    }

    let mut stages = Vec::new();
    let mut topo = Topo::new(&condensed);
    while let Some(cidx) = topo.next(&condensed) {
        let members = &components[condensed[cidx]];
        if members.len() == 1 {
            stages.push(Stage::Block(graph[members[0]].to_string()));
            continue;
        }
        match loop_stage(strategy, &graph, members) {
            Ok(stage) => stages.push(Stage::Loop(stage)),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(ExecutionOrder { stages })
    } else {
        Err(errors)
    }
}

fn loop_stage(
    strategy: &Strategy,
    graph: &DiGraph<&str, usize>,
    members: &[NodeIndex],
) -> Result<LoopStage, ValidationError> {
    let member_ids = || -> Vec<String> {
        members.iter().map(|&n| graph[n].to_string()).collect()
    };

    let loops: Vec<(NodeIndex, u32)> = members
        .iter()
        .filter_map(|&n| match strategy.block(graph[n]).map(|b| &b.params) {
            Some(BlockParams::Loop { iterations }) => Some((n, *iterations)),
            _ => None,
        })
        .collect();

    let (loop_idx, iterations) = match loops.as_slice() {
        [] => {
            return Err(ValidationError::IllegalCycle {
                block_ids: member_ids(),
            });
        }
        [single] => *single,
        _ => {
            return Err(ValidationError::NestedLoop {
                loop_ids: loops.iter().map(|(n, _)| graph[*n].to_string()).collect(),
            });
        }
    };

    let in_component: HashSet<NodeIndex> = members.iter().copied().collect();
    let mut body = DiGraph::<NodeIndex, ()>::new();
    let mut local: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for &n in members {
        local.insert(n, body.add_node(n));
    }

    let mut back_edges = Vec::new();
    for &n in members {
        for e in graph.edges(n) {
            if !in_component.contains(&e.target()) {
                continue;
            }
            if n == loop_idx {
                back_edges.push(strategy.edges[*e.weight()].id.clone());
            } else {
                body.add_edge(local[&n], local[&e.target()], ());
            }
        }
    }
    // petgraph walks adjacency newest-first
    back_edges.sort_by_key(|id| strategy.edges.iter().position(|e| &e.id == id));

    if is_cyclic_directed(&body) {
        return Err(ValidationError::IllegalCycle {
            block_ids: member_ids(),
        });
    }

    let mut order = Vec::with_capacity(members.len());
    let mut topo = Topo::new(&body);
    while let Some(i) = topo.next(&body) {
        order.push(graph[body[i]].to_string());
    }

    Ok(LoopStage {
        loop_id: graph[loop_idx].to_string(),
        iterations,
        body: order,
        back_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Block, Edge, Protocol};

    fn block(id: &str, params: BlockParams) -> Block {
        Block {
            id: id.into(),
            chain_id: 1,
            params,
        }
    }

    fn lend(id: &str) -> Block {
        block(
            id,
            BlockParams::Lend {
                protocol: Protocol::AaveV3,
                asset: Asset::WETH,
            },
        )
    }

    #[test]
    fn linear_chain_orders_by_edges() {
        let strategy = Strategy::new(
            vec![lend("c"), lend("a"), lend("b")],
            vec![Edge::new("e1", "a", "b", 100.0), Edge::new("e2", "b", "c", 100.0)],
        );
        let order = execution_order(&strategy).unwrap();
        assert_eq!(order.flatten(), vec!["a", "b", "c"]);
    }

    #[test]
    fn loop_component_is_contracted() {
        let strategy = Strategy::new(
            vec![
                lend("start"),
                lend("body"),
                block("loop", BlockParams::Loop { iterations: 3 }),
                lend("exit"),
            ],
            vec![
                Edge::new("e1", "start", "body", 100.0),
                Edge::new("e2", "body", "loop", 100.0),
                Edge::new("back", "loop", "body", 60.0),
                Edge::new("out", "loop", "exit", 40.0),
            ],
        );
        let order = execution_order(&strategy).unwrap();
        assert_eq!(order.stages.len(), 3);
        let Stage::Loop(stage) = &order.stages[1] else {
            panic!("expected loop stage, got {:?}", order.stages[1]);
        };
        assert_eq!(stage.loop_id, "loop");
        assert_eq!(stage.iterations, 3);
        assert_eq!(stage.body, vec!["body", "loop"]);
        assert_eq!(stage.back_edges, vec!["back"]);
        assert!(order.is_back_edge("back"));
        assert_eq!(order.flatten(), vec!["start", "body", "loop", "exit"]);
    }

    #[test]
    fn cycle_without_loop_block_is_illegal() {
        let strategy = Strategy::new(
            vec![lend("a"), lend("b")],
            vec![Edge::new("e1", "a", "b", 100.0), Edge::new("e2", "b", "a", 100.0)],
        );
        let errors = execution_order(&strategy).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::IllegalCycle {
                block_ids: vec!["a".into(), "b".into()]
            }]
        );
    }
}
