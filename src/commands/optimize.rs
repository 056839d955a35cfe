use std::path::Path;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::engine::optimizer;
use crate::validate;

pub fn run(
    file: &Path,
    market: Option<&Path>,
    output: Option<&Path>,
    config: &EngineConfig,
) -> Result<()> {
    let strategy = validate::load_strategy(file)?;
    let market = super::load_market(market, config)?;
    let outcome = optimizer::optimize_with(&strategy, &market, config.optimizer.max_passes);

    eprintln!(
        "Inserted {} auto-wrap block(s), {} incompatible edge(s).",
        outcome.inserted_count,
        outcome.incompatibilities.len()
    );
    for i in &outcome.incompatibilities {
        eprintln!("  {} ({} -> {}): {}", i.edge_id, i.source, i.target, i.reason);
    }

    super::emit_json(&outcome.strategy, output)?;
    if !outcome.incompatibilities.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
