use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::asset::Asset;

/// Conversion between a canonical token and its wrapped representation,
/// attached to blocks the route optimizer inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WrapStep {
    /// `true` for canonical → wrapped (e.g. eETH → weETH), `false` for the inverse.
    pub is_wrap: bool,
    pub from_asset: Asset,
    pub to_asset: Asset,
    /// Contract performing the conversion (0x-prefixed hex).
    pub wrapper_contract: String,
}

impl WrapStep {
    pub fn label(&self) -> String {
        let verb = if self.is_wrap { "wrap" } else { "unwrap" };
        format!("{verb} {}->{}", self.from_asset, self.to_asset)
    }
}
