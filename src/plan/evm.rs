use std::collections::HashMap;

use alloy::primitives::{Address, U256, address};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use anyhow::Context;

use crate::model::Asset;

// ── ERC20 contract interface ───────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

// ── Token address registry ─────────────────────────────────────────

/// ERC-20 address of `asset` on `chain_id`. Native ETH has none.
pub fn token_address(chain_id: u64, asset: Asset) -> Option<Address> {
    if asset.is_native() {
        return None;
    }
    TOKEN_REGISTRY.get(&(chain_id, asset)).copied()
}

token_registry! {
    // ── Ethereum ──
    (1, Asset::WETH) => "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
    (1, Asset::StEth) => "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84",
    (1, Asset::WstEth) => "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0",
    (1, Asset::EEth) => "0x35fA164735182de50811E8e2E824cFb9B6118ac2",
    (1, Asset::WeEth) => "0xCd5fE23C85820F7B72D0926FC9b05b43E359b7ee",
    (1, Asset::REth) => "0xae78736Cd615f374D3085123A210448E74Fc6393",
    (1, Asset::USDC) => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
    (1, Asset::USDT) => "0xdAC17F958D2ee523a2206206994597C13D831ec7",
    (1, Asset::DAI) => "0x6B175474E89094C44Da98b954EedeAC495271d0F",

    // ── Optimism ──
    (10, Asset::WETH) => "0x4200000000000000000000000000000000000006",
    (10, Asset::WstEth) => "0x1F32b1c2345538c0c6f582fCB022739c4A194Ebb",
    (10, Asset::USDC) => "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",

    // ── Base ──
    (8453, Asset::WETH) => "0x4200000000000000000000000000000000000006",
    (8453, Asset::WstEth) => "0xc1CBa3fCea344f92D9239c08C0568f6F2F0ee452",
    (8453, Asset::WeEth) => "0x04C0599Ae5A44757c0af6F9eC3b93da8976c150A",
    (8453, Asset::USDC) => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    (8453, Asset::DAI) => "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb",

    // ── Arbitrum ──
    (42161, Asset::WETH) => "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
    (42161, Asset::WstEth) => "0x5979D7b546E38E414F7E9822514be443A4800529",
    (42161, Asset::WeEth) => "0x35751007a407ca6FEFfE80b3cB397736D2cf4dbe",
    (42161, Asset::USDC) => "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
    (42161, Asset::USDT) => "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9",
}

// ── Utility functions ──────────────────────────────────────────────

/// Convert a USD value into base units of a token priced at `price`.
pub fn to_token_units(amount_usd: f64, price: f64, decimals: u8) -> U256 {
    if !(price > 0.0) || !(amount_usd > 0.0) {
        return U256::ZERO;
    }
    let token_amount = amount_usd / price;
    let scaled = token_amount * 10f64.powi(decimals as i32);
    U256::from(scaled as u128)
}

/// Convert base units into whole tokens (lossy above 2^53).
pub fn from_token_units(amount: U256, decimals: u8) -> f64 {
    let raw: f64 = amount.to_string().parse().unwrap_or(f64::MAX);
    raw / 10f64.powi(decimals as i32)
}

pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

/// Read-only HTTP provider for `rpc_url`.
pub fn read_provider(rpc_url: &str) -> anyhow::Result<DynProvider> {
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid RPC URL `{rpc_url}`"))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

// ── Token registry implementation ──────────────────────────────────

macro_rules! token_registry {
    ( $( ($chain:expr, $asset:expr) => $addr:literal ),* $(,)? ) => {
        fn build_token_registry() -> HashMap<(u64, Asset), Address> {
            let mut m = HashMap::new();
            $(
                m.insert(($chain, $asset), address!($addr));
            )*
            m
        }

        use std::sync::LazyLock;
        static TOKEN_REGISTRY: LazyLock<HashMap<(u64, Asset), Address>> =
            LazyLock::new(build_token_registry);
    };
}
use token_registry;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_eth_has_no_token_address() {
        assert_eq!(token_address(1, Asset::ETH), None);
        assert!(token_address(1, Asset::WeEth).is_some());
        assert_eq!(token_address(8453, Asset::EEth), None);
    }

    #[test]
    fn converts_usd_into_base_units() {
        let units = to_token_units(3000.0, 1.0, 6);
        assert_eq!(units, U256::from(3_000_000_000u64));
        assert_eq!(to_token_units(10.0, 0.0, 18), U256::ZERO);
        let whole = from_token_units(U256::from(2_500_000u64), 6);
        assert!((whole - 2.5).abs() < 1e-12);
    }
}
