use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{optimizer, simulator};
use crate::market::MarketData;
use crate::validate;

/// Editors emit several events per save.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Re-optimize and re-simulate `path` every time it is saved, until Ctrl-C.
pub async fn run(path: &Path, eth_price: f64, market: &MarketData) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("resolving {}", path.display()))?;
    let (_watcher, mut rx) = setup_file_watcher(&path)?;

    println!("Watching {} (Ctrl-C to stop)", path.display());
    report(&path, eth_price, market);

    loop {
        tokio::select! {
            changed = rx.recv() => {
                let Some(changed) = changed else { break };
                if !is_same_file(&changed, &path) {
                    continue;
                }
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}
                report(&path, eth_price, market);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("watch stopped");
                break;
            }
        }
    }
    Ok(())
}

fn report(path: &Path, eth_price: f64, market: &MarketData) {
    let strategy = match validate::load_strategy(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "could not load strategy");
            println!("[watch] {e:#}");
            return;
        }
    };

    let outcome = optimizer::optimize(&strategy, market);
    let result = simulator::simulate_strategy(&outcome.strategy, eth_price, market);

    println!(
        "[watch] {}: net APY {:.2}% | leverage {:.2}x | risk {} | HF {} | {} auto-wrap(s)",
        if strategy.name.is_empty() { "strategy" } else { &strategy.name },
        result.net_apy,
        result.leverage,
        result.risk_level,
        result
            .health_factor
            .map_or_else(|| "n/a".to_string(), |hf| format!("{hf:.2}")),
        outcome.inserted_count,
    );
    for incompatibility in &outcome.incompatibilities {
        println!("  ! {}", incompatibility.reason);
    }
    for warning in &result.warnings {
        println!("  - {warning}");
    }
}

fn is_same_file(changed: &Path, watched: &Path) -> bool {
    changed == watched || changed.file_name() == watched.file_name()
}

/// Watch the parent directory so atomic renames by editors are seen.
fn setup_file_watcher(path: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<PathBuf>)> {
    let (tx, rx) = mpsc::channel::<PathBuf>(16);

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    for path in event.paths {
                        let _ = tx.try_send(path);
                    }
                }
            }
        },
        notify::Config::default(),
    )
    .context("creating file watcher")?;

    let watch_dir = path.parent().unwrap_or(Path::new("."));
    watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .context("watching strategy directory")?;

    Ok((watcher, rx))
}
