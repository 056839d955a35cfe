use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::EngineConfig;
use crate::market::defillama;

pub async fn run(output: &Path, market: Option<&Path>, config: &EngineConfig) -> Result<()> {
    let mut market = super::load_market(market, config)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    let summary = defillama::refresh_yields(&client, &mut market.yields, &market.compat).await?;
    eprintln!("Updated {} rate(s) from DefiLlama.", summary.updated);
    for (protocol, asset) in &summary.missing {
        eprintln!("  no pool found for {asset} on {protocol}; kept previous value");
    }

    super::emit_json(&market, Some(output))
}
