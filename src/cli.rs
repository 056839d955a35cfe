use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DeFi strategy engine: validate, optimize, simulate and plan
/// block-graph strategies before they touch a wallet.
#[derive(Parser)]
#[command(name = "strategy-flow", version, about)]
pub struct Cli {
    /// Config file (default: $STRATEGY_FLOW_CONFIG, ./strategy-flow.toml,
    /// then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level or filter directives (e.g. "debug" or "strategy_flow=trace")
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for strategy definitions
    Schema,

    /// Output an example strategy JSON to stdout
    Example,

    /// Validate a strategy JSON file
    Validate {
        /// Path to the strategy JSON file
        file: PathBuf,
    },

    /// Insert auto-wrap blocks where edges carry the wrong asset
    Optimize {
        /// Path to the strategy JSON file
        file: PathBuf,

        /// Market data JSON (default: config, then built-in reference rates)
        #[arg(long)]
        market: Option<PathBuf>,

        /// Write the optimized strategy here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Project APY, leverage and risk for a strategy
    Simulate {
        /// Path to the strategy JSON file
        file: PathBuf,

        /// ETH price in USD
        #[arg(long)]
        eth_price: f64,

        /// Market data JSON (default: config, then built-in reference rates)
        #[arg(long)]
        market: Option<PathBuf>,

        /// Simulate the strategy as written, without route optimization
        #[arg(long)]
        no_optimize: bool,
    },

    /// Build a transaction plan for a wallet
    Plan {
        /// Path to the strategy JSON file
        file: PathBuf,

        /// Wallet address the plan executes from
        #[arg(long)]
        wallet: String,

        /// ETH price in USD
        #[arg(long)]
        eth_price: f64,

        /// Input amount in whole tokens (default: the input block's amount)
        #[arg(long)]
        amount: Option<f64>,

        /// Market data JSON (default: config, then built-in reference rates)
        #[arg(long)]
        market: Option<PathBuf>,

        /// Read current allowances and mark redundant approvals skippable
        #[arg(long)]
        check_approvals: bool,

        /// Write the plan JSON here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Re-simulate a strategy file every time it is saved
    Watch {
        /// Path to the strategy JSON file
        file: PathBuf,

        /// ETH price in USD
        #[arg(long)]
        eth_price: f64,

        /// Market data JSON (default: config, then built-in reference rates)
        #[arg(long)]
        market: Option<PathBuf>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Market data JSON (default: config, then built-in reference rates)
        #[arg(long)]
        market: Option<PathBuf>,
    },

    /// Refresh yield rates from DefiLlama into a market data file
    FetchYields {
        /// Output market data JSON
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Existing market data to update (default: built-in reference)
        #[arg(long)]
        market: Option<PathBuf>,
    },
}
