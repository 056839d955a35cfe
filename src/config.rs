use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::engine::optimizer::DEFAULT_MAX_PASSES;
use crate::model::Chain;
use crate::plan::builder::DEFAULT_PLAN_TTL_SECS;

pub const CONFIG_ENV: &str = "STRATEGY_FLOW_CONFIG";
pub const LOCAL_CONFIG_FILE: &str = "strategy-flow.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("[rpc] key `{0}` is not a chain id")]
    InvalidChainId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimizer: OptimizerConfig,
    pub plan: PlanConfig,
    /// Chain id (as a string key) to JSON-RPC URL.
    pub rpc: BTreeMap<String, String>,
    /// Market snapshot (JSON) replacing the built-in reference table.
    pub market_data: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_passes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub ttl_secs: i64,
    pub allowance_timeout_ms: u64,
    pub gas_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let rpc = Chain::known()
            .into_iter()
            .filter_map(|c| Some((c.chain_id.to_string(), c.rpc_url?)))
            .collect();

        EngineConfig {
            optimizer: OptimizerConfig::default(),
            plan: PlanConfig::default(),
            rpc,
            market_data: None,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            ttl_secs: DEFAULT_PLAN_TTL_SECS,
            allowance_timeout_ms: 3_000,
            gas_timeout_ms: 3_000,
        }
    }
}

impl EngineConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.plan.ttl_secs)
    }

    pub fn allowance_timeout(&self) -> Duration {
        Duration::from_millis(self.plan.allowance_timeout_ms)
    }

    pub fn gas_timeout(&self) -> Duration {
        Duration::from_millis(self.plan.gas_timeout_ms)
    }

    pub fn rpc_endpoints(&self) -> Result<HashMap<u64, String>, ConfigError> {
        self.rpc
            .iter()
            .map(|(chain, url)| {
                chain
                    .trim()
                    .parse::<u64>()
                    .map(|id| (id, url.clone()))
                    .map_err(|_| ConfigError::InvalidChainId(chain.clone()))
            })
            .collect()
    }

    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.rpc_endpoints()?;
        Ok(config)
    }
}

/// Search order: explicit path, `$STRATEGY_FLOW_CONFIG`, `./strategy-flow.toml`,
/// then the user config directory. Missing files fall through to defaults;
/// an explicit path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    if let Some(path) = path {
        return read_file(path);
    }

    for candidate in candidate_paths() {
        if candidate.exists() {
            return read_file(&candidate);
        }
    }

    debug!("no config file found, using defaults");
    Ok(EngineConfig::default())
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            paths.push(PathBuf::from(env_path));
        }
    }
    paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("strategy-flow").join("config.toml"));
    }
    paths
}

fn read_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = EngineConfig::from_toml(&contents, path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let toml = r#"
            [plan]
            ttl_secs = 60

            [rpc]
            "1" = "http://localhost:8545"
        "#;
        let config = EngineConfig::from_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.plan.ttl_secs, 60);
        assert_eq!(config.plan.gas_timeout_ms, 3_000);
        assert_eq!(config.optimizer.max_passes, DEFAULT_MAX_PASSES);
        let endpoints = config.rpc_endpoints().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[&1], "http://localhost:8545");
    }

    #[test]
    fn defaults_cover_known_chains() {
        let endpoints = EngineConfig::default().rpc_endpoints().unwrap();
        for chain in [Chain::ETHEREUM, Chain::OPTIMISM, Chain::BASE, Chain::ARBITRUM] {
            assert!(endpoints.contains_key(&chain));
        }
    }

    #[test]
    fn rejects_non_numeric_chain_keys() {
        let toml = r#"
            [rpc]
            mainnet = "http://localhost:8545"
        "#;
        let err = EngineConfig::from_toml(toml, Path::new("test.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChainId(ref k) if k == "mainnet"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/strategy-flow.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
