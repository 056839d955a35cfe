use std::path::Path;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::engine::{optimizer, simulator};
use crate::validate;

pub fn run(
    file: &Path,
    eth_price: f64,
    market: Option<&Path>,
    no_optimize: bool,
    config: &EngineConfig,
) -> Result<()> {
    let strategy = validate::load_strategy(file)?;
    let market = super::load_market(market, config)?;

    let strategy = if no_optimize {
        strategy
    } else {
        let outcome = optimizer::optimize_with(&strategy, &market, config.optimizer.max_passes);
        for i in &outcome.incompatibilities {
            eprintln!("warning: {}", i.reason);
        }
        outcome.strategy
    };

    let result = simulator::simulate_strategy(&strategy, eth_price, &market);
    super::emit_json(&result, None)
}
