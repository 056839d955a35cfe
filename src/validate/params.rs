use crate::model::block::MAX_LOOP_ITERATIONS;
use crate::model::{Block, BlockParams, Protocol, ProtocolCategory, Strategy};

use super::ValidationError;

/// Check every block's typed parameters for range and category errors.
pub fn check_params(strategy: &Strategy) -> Vec<ValidationError> {
    strategy.blocks.iter().flat_map(check_block).collect()
}

fn check_block(block: &Block) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut invalid = |field: &str, reason: String| {
        errors.push(ValidationError::InvalidParams {
            block_id: block.id.clone(),
            field: field.to_string(),
            reason,
        });
    };

    if block.chain_id == 0 {
        invalid("chain_id", "must be a non-zero EVM chain id".into());
    }

    match &block.params {
        BlockParams::Input { amount, .. } => {
            if !amount.is_finite() || *amount <= 0.0 {
                invalid("amount", format!("must be a positive number, got {amount}"));
            }
        }
        BlockParams::Stake { protocol, .. } => {
            if let Some(reason) = category_mismatch(*protocol, ProtocolCategory::Staking) {
                invalid("protocol", reason);
            }
        }
        BlockParams::Lend { protocol, .. } => {
            if let Some(reason) = category_mismatch(*protocol, ProtocolCategory::Lending) {
                invalid("protocol", reason);
            }
        }
        BlockParams::Borrow {
            protocol,
            target_ltv,
            ..
        } => {
            if let Some(reason) = category_mismatch(*protocol, ProtocolCategory::Lending) {
                invalid("protocol", reason);
            }
            if !target_ltv.is_finite() || *target_ltv <= 0.0 || *target_ltv >= 1.0 {
                invalid(
                    "target_ltv",
                    format!("must be between 0 and 1 (exclusive), got {target_ltv}"),
                );
            }
        }
        BlockParams::Swap {
            protocol,
            slippage_bps,
            ..
        } => {
            if let Some(reason) = category_mismatch(*protocol, ProtocolCategory::Dex) {
                invalid("protocol", reason);
            }
            if let Some(bps) = slippage_bps {
                if !bps.is_finite() || *bps < 0.0 || *bps > 10_000.0 {
                    invalid("slippage_bps", format!("must be within 0..=10000, got {bps}"));
                }
            }
        }
        BlockParams::Loop { iterations } => {
            if *iterations == 0 || *iterations > MAX_LOOP_ITERATIONS {
                invalid(
                    "iterations",
                    format!("must be within 1..={MAX_LOOP_ITERATIONS}, got {iterations}"),
                );
            }
        }
        BlockParams::AutoWrap(wrap) => {
            if wrap.from_asset == wrap.to_asset {
                invalid(
                    "to_asset",
                    format!("wrapping {} into itself", wrap.from_asset),
                );
            }
            if wrap.wrapper_contract.trim().is_empty() {
                invalid("wrapper_contract", "missing contract address".into());
            }
        }
    }

    errors
}

fn category_mismatch(protocol: Protocol, expected: ProtocolCategory) -> Option<String> {
    let actual = protocol.category();
    (actual != expected).then(|| format!("{protocol} is a {actual:?} protocol, expected {expected:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Asset;

    fn block(params: BlockParams) -> Block {
        Block {
            id: "b".into(),
            chain_id: 1,
            params,
        }
    }

    #[test]
    fn rejects_out_of_range_ltv() {
        let errors = check_block(&block(BlockParams::Borrow {
            protocol: Protocol::AaveV3,
            asset: Asset::USDC,
            target_ltv: 1.2,
        }));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidParams { field, .. } if field == "target_ltv"
        ));
    }

    #[test]
    fn rejects_protocol_of_wrong_category() {
        let errors = check_block(&block(BlockParams::Stake {
            protocol: Protocol::AaveV3,
            asset: Asset::ETH,
        }));
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidParams { field, .. } if field == "protocol"
        ));
    }

    #[test]
    fn accepts_well_formed_swap() {
        let errors = check_block(&block(BlockParams::Swap {
            protocol: Protocol::UniswapV3,
            to_asset: Asset::WETH,
            slippage_bps: Some(30.0),
        }));
        assert!(errors.is_empty());
    }
}
