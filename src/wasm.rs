use wasm_bindgen::prelude::*;

use crate::engine::{optimizer, simulator};
use crate::market::MarketData;
use crate::model::Strategy;
use crate::validate;

fn parse(json: &str) -> Result<Strategy, String> {
    serde_json::from_str(json).map_err(|e| {
        serde_json::json!({ "error": format!("JSON parse error: {e}") }).to_string()
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("Serialization error: {e}") }).to_string()
    })
}

#[wasm_bindgen]
pub fn validate_strategy_json(json: &str) -> String {
    match parse(json) {
        Ok(strategy) => to_json(&validate::validate(&strategy)),
        Err(e) => e,
    }
}

#[wasm_bindgen]
pub fn optimize_strategy_json(json: &str) -> String {
    match parse(json) {
        Ok(strategy) => to_json(&optimizer::optimize(&strategy, &MarketData::default())),
        Err(e) => e,
    }
}

/// Simulate against the built-in reference market data.
#[wasm_bindgen]
pub fn simulate_strategy_json(json: &str, eth_price: f64) -> String {
    match parse(json) {
        Ok(strategy) => to_json(&simulator::simulate_strategy(
            &strategy,
            eth_price,
            &MarketData::default(),
        )),
        Err(e) => e,
    }
}

#[wasm_bindgen]
pub fn get_schema() -> String {
    crate::schema::get_schema_json()
}
