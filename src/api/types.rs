use serde::{Deserialize, Serialize};

use crate::engine::{RouteIncompatibility, SimulationResult};
use crate::model::Strategy;
use crate::validate::ValidationError;

// ── Request types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub strategy: Strategy,
}

#[derive(Deserialize)]
pub struct OptimizeRequest {
    pub strategy: Strategy,
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    pub strategy: Strategy,
    pub eth_price: f64,
    /// Run the route optimizer before simulating.
    #[serde(default = "default_true")]
    pub optimize: bool,
}

#[derive(Deserialize)]
pub struct PlanRequest {
    pub strategy: Strategy,
    pub wallet: String,
    pub eth_price: f64,
    /// Input amount in base units, as a decimal string.
    pub input_amount: String,
    #[serde(default = "default_true")]
    pub check_approvals: bool,
}

fn default_true() -> bool {
    true
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

#[derive(Serialize)]
pub struct OptimizeResponse {
    pub strategy: Strategy,
    pub inserted_count: usize,
    pub incompatibilities: Vec<RouteIncompatibility>,
}

#[derive(Serialize)]
pub struct SimulateResponse {
    pub result: SimulationResult,
    pub inserted_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incompatibilities: Vec<RouteIncompatibility>,
}
