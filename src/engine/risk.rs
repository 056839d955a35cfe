use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarse liquidation-risk bucket shown next to a simulation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Bucket from leverage and health factor, worst bucket wins.
    /// A missing health factor (no debt) never raises the level.
    pub fn classify(leverage: f64, health_factor: Option<f64>) -> RiskLevel {
        let hf_below = |limit: f64| health_factor.is_some_and(|hf| hf < limit);

        if leverage > 3.0 || hf_below(1.1) {
            RiskLevel::Extreme
        } else if leverage > 2.0 || hf_below(1.3) {
            RiskLevel::High
        } else if leverage > 1.3 || hf_below(1.6) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// `collateral × liquidation_threshold / debt`, or `None` without debt.
///
/// One liquidation threshold is applied to the whole collateral pool, even
/// when several collateral assets are involved. Real markets use
/// per-asset thresholds; this is a known simplification.
pub fn health_factor(collateral_usd: f64, debt_usd: f64, liquidation_threshold: f64) -> Option<f64> {
    (debt_usd > 0.0).then(|| collateral_usd * liquidation_threshold / debt_usd)
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        };
        f.write_str(s)
    }
}
