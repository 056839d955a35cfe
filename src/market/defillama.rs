use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::model::{Asset, Protocol, ProtocolCategory};

use super::{Compatibility, YieldTable};

const POOLS_URL: &str = "https://yields.llama.fi/pools";
const LEND_BORROW_URL: &str = "https://yields.llama.fi/lendBorrow";

// ── API response types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PoolsResponse {
    data: Vec<Pool>,
}

#[derive(Debug, Deserialize)]
struct Pool {
    pool: String,
    chain: Option<String>,
    project: String,
    symbol: String,
    #[serde(rename = "tvlUsd")]
    tvl_usd: Option<f64>,
    apy: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BorrowRate {
    pool: String,
    #[serde(rename = "apyBaseBorrow")]
    apy_base_borrow: Option<f64>,
}

/// Outcome of a refresh: which table entries were updated and which had
/// no matching pool.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub updated: usize,
    pub missing: Vec<(Protocol, Asset)>,
}

// ── Public API ───────────────────────────────────────────────────────

/// Refresh every entry of `table` from DefiLlama's Ethereum pools.
///
/// Supply APY comes from `/pools`, borrow APR from `/lendBorrow`. Staking
/// entries are matched by their receipt token symbol. Entries without a
/// matching pool keep their current values and are listed in the summary.
pub async fn refresh_yields(
    client: &reqwest::Client,
    table: &mut YieldTable,
    compat: &Compatibility,
) -> Result<RefreshSummary> {
    let pools = retry(3, || {
        let client = client.clone();
        async move {
            let r = client
                .get(POOLS_URL)
                .send()
                .await?
                .error_for_status()?
                .json::<PoolsResponse>()
                .await?;
            Ok(r.data)
        }
    })
    .await
    .context("fetching DefiLlama pools")?;

    let borrow_rates: HashMap<String, f64> = match retry(3, || {
        let client = client.clone();
        async move {
            let r = client
                .get(LEND_BORROW_URL)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<BorrowRate>>()
                .await?;
            Ok(r)
        }
    })
    .await
    {
        Ok(rates) => rates
            .into_iter()
            .filter_map(|r| r.apy_base_borrow.map(|apr| (r.pool, apr)))
            .collect(),
        Err(e) => {
            warn!(error = %e, "borrow rates unavailable, keeping current borrow APRs");
            HashMap::new()
        }
    };

    let mut summary = RefreshSummary::default();
    let keys: Vec<(Protocol, Asset)> = table
        .entries()
        .iter()
        .map(|e| (e.protocol, e.asset))
        .collect();

    for (protocol, asset) in keys {
        let symbol = match protocol.category() {
            ProtocolCategory::Staking => compat.stake_receipt(protocol, asset).unwrap_or(asset),
            _ => asset,
        };
        let Some(pool) = best_pool(&pools, protocol.defillama_slug(), symbol.symbol()) else {
            debug!(%protocol, %asset, "no DefiLlama pool");
            summary.missing.push((protocol, asset));
            continue;
        };

        if let Some(apy) = pool.apy {
            table.set_supply(protocol, asset, apy);
        }
        if let Some(&apr) = borrow_rates.get(&pool.pool) {
            table.set_borrow(protocol, asset, apr);
        }
        summary.updated += 1;
    }

    info!(
        updated = summary.updated,
        missing = summary.missing.len(),
        "refreshed yield table from DefiLlama"
    );
    Ok(summary)
}

/// Largest-TVL Ethereum pool for a project whose symbol contains `symbol`.
fn best_pool<'a>(pools: &'a [Pool], project: &str, symbol: &str) -> Option<&'a Pool> {
    let symbol_upper = symbol.to_uppercase();
    pools
        .iter()
        .filter(|p| {
            p.project.eq_ignore_ascii_case(project)
                && p.chain
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case("ethereum"))
                && p.symbol.to_uppercase().contains(&symbol_upper)
        })
        .max_by(|a, b| {
            a.tvl_usd
                .unwrap_or(0.0)
                .partial_cmp(&b.tvl_usd.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Retry an async operation with exponential backoff.
async fn retry<T, F, Fut>(max_retries: u32, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..=max_retries {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                debug!(attempt, error = %e, "request failed");
                last_err = Some(e);
                if attempt < max_retries {
                    tokio::time::sleep(Duration::from_millis(1000 * 2u64.pow(attempt))).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("no attempts made")))
}
