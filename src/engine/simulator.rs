use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::market::MarketData;
use crate::model::{Asset, Block, BlockParams, Edge, Strategy};
use crate::validate;

use super::risk::{self, RiskLevel};
use super::topo::{self, LoopStage, Stage};

/// Aggregate projection for one strategy snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimulationResult {
    pub is_valid: bool,
    /// Net annual yield in percent of the initial value.
    pub net_apy: f64,
    pub projected_value_1y: f64,
    pub initial_value: f64,
    pub leverage: f64,
    pub risk_level: RiskLevel,
    /// `None` when the strategy carries no debt.
    pub health_factor: Option<f64>,
    pub warnings: Vec<String>,
    pub total_collateral_usd: f64,
    pub total_debt_usd: f64,
    /// Per-block output, summed over loop iterations.
    pub blocks: Vec<BlockOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockOutcome {
    pub block_id: String,
    /// `None` when the output asset is unknown or mixed.
    pub asset: Option<Asset>,
    /// Token units of `asset`.
    pub amount: Option<f64>,
    pub value_usd: f64,
}

/// Value moving along the graph, denominated in USD.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Flow {
    pub asset: Option<Asset>,
    pub value_usd: f64,
}

impl Flow {
    pub fn new(asset: Asset, value_usd: f64) -> Self {
        Flow {
            asset: Some(asset),
            value_usd,
        }
    }

    fn scaled(self, share: f64) -> Flow {
        Flow {
            asset: self.asset,
            value_usd: self.value_usd * share,
        }
    }

    /// Combine two flows. Empty flows carry no asset information;
    /// differing assets merge into an unknown one.
    fn merge(self, other: Flow) -> Flow {
        if other.value_usd <= 0.0 {
            return self;
        }
        if self.value_usd <= 0.0 {
            return other;
        }
        Flow {
            asset: if self.asset == other.asset {
                self.asset
            } else {
                None
            },
            value_usd: self.value_usd + other.value_usd,
        }
    }
}

/// One execution of one block. Loop bodies produce one visit per iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub block_id: String,
    pub iteration: u32,
    pub inflow: Flow,
    pub outflow: Flow,
}

/// Full simulation output: the aggregate result plus the ordered visit
/// trace the plan builder turns into transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub result: SimulationResult,
    pub trace: Vec<Visit>,
}

/// Project a strategy's outcome. Pure: identical inputs give identical
/// results, and nothing outside the arguments is read.
pub fn simulate(
    blocks: &[Block],
    edges: &[Edge],
    eth_price: f64,
    market: &MarketData,
) -> SimulationResult {
    run(
        &Strategy::new(blocks.to_vec(), edges.to_vec()),
        eth_price,
        market,
    )
    .result
}

pub fn simulate_strategy(
    strategy: &Strategy,
    eth_price: f64,
    market: &MarketData,
) -> SimulationResult {
    run(strategy, eth_price, market).result
}

/// Simulate and keep the visit trace.
pub fn run(strategy: &Strategy, eth_price: f64, market: &MarketData) -> Simulation {
    let report = validate::validate(strategy);
    let mut warnings: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();

    if report.prevents_execution() {
        return Simulation {
            result: SimulationResult::empty(warnings),
            trace: Vec::new(),
        };
    }
    let order = match topo::execution_order(strategy) {
        Ok(order) => order,
        Err(errors) => {
            warnings.extend(errors.iter().map(|e| e.to_string()));
            return Simulation {
                result: SimulationResult::empty(warnings),
                trace: Vec::new(),
            };
        }
    };

    let mut resolved = true;
    if !(eth_price.is_finite() && eth_price > 0.0) {
        warnings.push(format!("ETH price must be positive, got {eth_price}"));
        resolved = false;
    }

    let mut sim = Simulator {
        strategy,
        blocks: strategy.block_map(),
        market,
        eth_price,
        initial_value: 0.0,
        yield_usd: 0.0,
        cost_usd: 0.0,
        borrowed_usd: 0.0,
        collateral_usd: 0.0,
        debt_usd: 0.0,
        emitted: HashMap::new(),
        trace: Vec::new(),
        warnings,
        structurally_valid: report.is_valid,
        resolved,
    };

    for stage in &order.stages {
        match stage {
            Stage::Block(id) => sim.run_block(id),
            Stage::Loop(l) => sim.run_loop(l),
        }
    }

    sim.finish()
}

impl SimulationResult {
    fn empty(warnings: Vec<String>) -> Self {
        SimulationResult {
            is_valid: false,
            net_apy: 0.0,
            projected_value_1y: 0.0,
            initial_value: 0.0,
            leverage: 1.0,
            risk_level: RiskLevel::Low,
            health_factor: None,
            warnings,
            total_collateral_usd: 0.0,
            total_debt_usd: 0.0,
            blocks: Vec::new(),
        }
    }
}

// ── Walker ───────────────────────────────────────────────────────────

struct Simulator<'a> {
    strategy: &'a Strategy,
    blocks: HashMap<&'a str, &'a Block>,
    market: &'a MarketData,
    eth_price: f64,

    initial_value: f64,
    yield_usd: f64,
    cost_usd: f64,
    borrowed_usd: f64,
    collateral_usd: f64,
    debt_usd: f64,

    /// Output of each executed block, summed over iterations.
    emitted: HashMap<String, Flow>,
    trace: Vec<Visit>,
    warnings: Vec<String>,
    structurally_valid: bool,
    resolved: bool,
}

impl<'a> Simulator<'a> {
    fn run_block(&mut self, id: &str) {
        if self.blocks.get(id).is_some_and(|b| b.is_loop()) {
            self.warnings.push(format!(
                "Loop block `{id}` does not close a cycle; treated as pass-through"
            ));
        }
        let inflow = self.external_inflow(id, None);
        let outflow = self.apply(id, inflow, 0);
        self.emitted.insert(id.to_string(), outflow);
    }

    /// Unroll a loop component. Iteration 0 takes the external inflow,
    /// later iterations take the loop block's previous output along its
    /// back edges. The final iteration's back-edge share is not re-entered.
    fn run_loop(&mut self, stage: &LoopStage) {
        let back_edges: HashSet<&str> = stage.back_edges.iter().map(String::as_str).collect();
        let mut previous_loop_out = Flow::default();

        for iteration in 0..stage.iterations {
            let mut iter_out: HashMap<&str, Flow> = HashMap::new();

            for id in &stage.body {
                let mut inflow = if iteration == 0 {
                    self.external_inflow(id, Some(stage))
                } else {
                    Flow::default()
                };
                for edge in self.strategy.incoming(id) {
                    if !stage.contains(&edge.source) {
                        continue;
                    }
                    let contribution = if back_edges.contains(edge.id.as_str()) {
                        if iteration == 0 {
                            continue;
                        }
                        previous_loop_out.scaled(edge.share())
                    } else {
                        iter_out
                            .get(edge.source.as_str())
                            .copied()
                            .unwrap_or_default()
                            .scaled(edge.share())
                    };
                    inflow = inflow.merge(contribution);
                }

                let outflow = self.apply(id, inflow, iteration);
                iter_out.insert(id.as_str(), outflow);
                let total = self.emitted.entry(id.clone()).or_default();
                *total = total.merge(outflow);
            }

            previous_loop_out = iter_out
                .get(stage.loop_id.as_str())
                .copied()
                .unwrap_or_default();
        }
        debug!(loop_id = %stage.loop_id, iterations = stage.iterations, "unrolled loop");
    }

    /// Inflow from blocks outside `stage` (or from everything, for plain blocks).
    fn external_inflow(&self, id: &str, stage: Option<&LoopStage>) -> Flow {
        self.strategy
            .incoming(id)
            .filter(|e| stage.is_none_or(|s| !s.contains(&e.source)))
            .filter_map(|e| self.emitted.get(&e.source).map(|f| f.scaled(e.share())))
            .fold(Flow::default(), Flow::merge)
    }

    /// Execute one block visit and return its outflow.
    fn apply(&mut self, id: &str, inflow: Flow, iteration: u32) -> Flow {
        let Some(&block) = self.blocks.get(id) else {
            return Flow::default();
        };

        if let Some(expected) = block.expected_input() {
            if inflow.value_usd > 0.0 && inflow.asset != Some(expected) {
                let got = inflow
                    .asset
                    .map_or_else(|| "an unknown or mixed asset".to_string(), |a| a.to_string());
                self.unresolved(format!("Block `{id}` expects {expected} but receives {got}"));
            }
        }

        let value = inflow.value_usd;
        let outflow = match &block.params {
            // Emits the starting amount once, even if a malformed graph
            // revisits it inside a loop.
            BlockParams::Input { asset, amount } => {
                if iteration > 0 {
                    Flow::default()
                } else {
                    self.initial_value = amount * self.market.price_usd(*asset, self.eth_price);
                    Flow::new(*asset, self.initial_value)
                }
            }
            BlockParams::Stake { protocol, asset } => {
                match self.market.supply_apy(*protocol, *asset) {
                    Some(apy) => self.yield_usd += value * apy / 100.0,
                    None => self.unresolved(format!("No staking APY for {asset} on {protocol}")),
                }
                let receipt = self.market.stake_receipt(*protocol, *asset);
                if receipt.is_none() {
                    self.unresolved(format!(
                        "No receipt token known for staking {asset} on {protocol}"
                    ));
                }
                Flow {
                    asset: receipt,
                    value_usd: value,
                }
            }
            BlockParams::Lend { protocol, asset } => {
                match self.market.supply_apy(*protocol, *asset) {
                    Some(apy) => self.yield_usd += value * apy / 100.0,
                    None => self.unresolved(format!("No supply APY for {asset} on {protocol}")),
                }
                self.collateral_usd += value;
                Flow::new(*asset, value)
            }
            BlockParams::Borrow {
                protocol,
                asset,
                target_ltv,
            } => {
                let borrowed = value * target_ltv;
                match self.market.borrow_apr(*protocol, *asset) {
                    Some(apr) => self.cost_usd += borrowed * apr / 100.0,
                    None => self.unresolved(format!("No borrow APR for {asset} on {protocol}")),
                }
                self.borrowed_usd += borrowed;
                self.debt_usd += borrowed;
                Flow::new(*asset, borrowed)
            }
            BlockParams::Swap {
                protocol,
                to_asset,
                slippage_bps,
            } => {
                let bps = slippage_bps.or_else(|| self.market.slippage_bps(*protocol));
                let kept = match bps {
                    Some(bps) => value * (1.0 - bps / 10_000.0),
                    None => {
                        self.unresolved(format!("No slippage configured for {protocol}"));
                        value
                    }
                };
                Flow::new(*to_asset, kept)
            }
            BlockParams::Loop { .. } => inflow,
            BlockParams::AutoWrap(wrap) => Flow::new(wrap.to_asset, value),
        };

        self.trace.push(Visit {
            block_id: id.to_string(),
            iteration,
            inflow,
            outflow,
        });
        outflow
    }

    /// Record a resolution problem once.
    fn unresolved(&mut self, warning: String) {
        self.resolved = false;
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn finish(self) -> Simulation {
        let initial = self.initial_value;

        let (net_apy, leverage) = if initial > 0.0 {
            (
                (self.yield_usd - self.cost_usd) / initial * 100.0,
                1.0 + self.borrowed_usd / initial,
            )
        } else {
            (0.0, 1.0)
        };
        let health_factor = risk::health_factor(
            self.collateral_usd,
            self.debt_usd,
            self.market.liquidation_threshold,
        );

        let blocks = self
            .strategy
            .blocks
            .iter()
            .map(|b| {
                let flow = self.emitted.get(&b.id).copied().unwrap_or_default();
                let amount = flow.asset.and_then(|a| {
                    let price = self.market.price_usd(a, self.eth_price);
                    (price > 0.0).then(|| flow.value_usd / price)
                });
                BlockOutcome {
                    block_id: b.id.clone(),
                    asset: flow.asset,
                    amount,
                    value_usd: flow.value_usd,
                }
            })
            .collect();

        Simulation {
            result: SimulationResult {
                is_valid: self.structurally_valid && self.resolved,
                net_apy,
                projected_value_1y: initial * (1.0 + net_apy / 100.0),
                initial_value: initial,
                leverage,
                risk_level: RiskLevel::classify(leverage, health_factor),
                health_factor,
                warnings: self.warnings,
                total_collateral_usd: self.collateral_usd,
                total_debt_usd: self.debt_usd,
                blocks,
            },
            trace: self.trace,
        }
    }
}
