//! Strategy engine for block-graph DeFi strategies: validation, route
//! optimization, yield/risk simulation and transaction planning.
//!
//! `model`, `validate`, `engine` and `market` are pure and build for
//! WASM. Planning, the HTTP API and the CLI need the `full` feature.

pub mod engine;
pub mod example;
pub mod market;
pub mod model;
pub mod schema;
pub mod validate;

#[cfg(feature = "full")]
pub mod api;
#[cfg(feature = "full")]
pub mod cli;
#[cfg(feature = "full")]
pub mod commands;
#[cfg(feature = "full")]
pub mod config;
#[cfg(feature = "full")]
pub mod logging;
#[cfg(feature = "full")]
pub mod plan;
#[cfg(feature = "full")]
pub mod watch;

#[cfg(feature = "wasm")]
pub mod wasm;
