//! Runners for the CLI subcommands that need config, market data or I/O.

pub mod fetch_yields;
pub mod optimize;
pub mod plan;
pub mod simulate;

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::config::EngineConfig;
use crate::market::MarketData;

/// Market data from `--market`, else the config's `market_data`, else the
/// built-in reference table.
pub fn load_market(explicit: Option<&Path>, config: &EngineConfig) -> Result<MarketData> {
    match explicit.or(config.market_data.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "loading market data");
            MarketData::load(path)
        }
        None => Ok(MarketData::default()),
    }
}

/// Write pretty JSON to `output`, or stdout when absent.
pub fn emit_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    use anyhow::Context;

    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
