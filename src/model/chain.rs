use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A known EVM chain. Blocks carry a bare `chain_id`; this registry
/// resolves names and default RPC endpoints for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Chain {
    /// Human-readable chain name (e.g. "ethereum", "base").
    pub name: String,
    /// EVM chain ID.
    pub chain_id: u64,
    /// Default public JSON-RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

// ── Methods ──────────────────────────────────────────────────────────

impl Chain {
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url.as_deref()
    }
}

// ── Convenience constructors ─────────────────────────────────────────

impl Chain {
    pub const ETHEREUM: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;

    pub fn ethereum() -> Self {
        Chain {
            name: "ethereum".into(),
            chain_id: Self::ETHEREUM,
            rpc_url: Some("https://eth.llamarpc.com".into()),
        }
    }
    pub fn optimism() -> Self {
        Chain {
            name: "optimism".into(),
            chain_id: Self::OPTIMISM,
            rpc_url: Some("https://mainnet.optimism.io".into()),
        }
    }
    pub fn base() -> Self {
        Chain {
            name: "base".into(),
            chain_id: Self::BASE,
            rpc_url: Some("https://mainnet.base.org".into()),
        }
    }
    pub fn arbitrum() -> Self {
        Chain {
            name: "arbitrum".into(),
            chain_id: Self::ARBITRUM,
            rpc_url: Some("https://arb1.arbitrum.io/rpc".into()),
        }
    }

    /// All chains with built-in defaults.
    pub fn known() -> Vec<Chain> {
        vec![
            Self::ethereum(),
            Self::optimism(),
            Self::base(),
            Self::arbitrum(),
        ]
    }

    /// Resolve a chain by ID. Unknown IDs get a name-only entry with no RPC.
    pub fn from_id(chain_id: u64) -> Self {
        Self::known()
            .into_iter()
            .find(|c| c.chain_id == chain_id)
            .unwrap_or_else(|| Chain {
                name: format!("chain-{chain_id}"),
                chain_id,
                rpc_url: None,
            })
    }
}

// ── Display ──────────────────────────────────────────────────────────

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
