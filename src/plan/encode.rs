use std::collections::HashMap;

use alloy::primitives::aliases::{U24, U160};
use alloy::primitives::{Address, Bytes, U256, address};
use alloy::sol;
use alloy::sol_types::SolCall;
use thiserror::Error;

use crate::model::{Asset, Block, BlockParams, Protocol, WrapStep};

use super::evm;
use super::{StepAction, TokenAmount};

// ── Protocol interfaces ────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract ILido {
        function submit(address referral) external payable returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IEtherFiLiquidityPool {
        function deposit() external payable returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IRocketDepositPool {
        function deposit() external payable;
    }
}

sol! {
    #[allow(missing_docs)]
    contract IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
    }
}

sol! {
    #[allow(missing_docs)]
    contract IComet {
        function supply(address asset, uint256 amount) external;
        function withdraw(address asset, uint256 amount) external;
    }
}

sol! {
    #[allow(missing_docs)]
    contract ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }
        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IWrappedToken {
        function wrap(uint256 amount) external returns (uint256);
        function unwrap(uint256 amount) external returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IWETH {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

/// Aave variable-rate borrow mode.
const VARIABLE_RATE: u64 = 2;

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no {protocol} contract known on chain {chain_id}")]
    UnknownContract { protocol: Protocol, chain_id: u64 },

    #[error("no token address for {asset} on chain {chain_id}")]
    UnknownToken { asset: Asset, chain_id: u64 },

    #[error("block `{block_id}`: {protocol} cannot {action} {asset}")]
    Unsupported {
        block_id: String,
        protocol: String,
        action: StepAction,
        asset: Asset,
    },

    #[error("block `{block_id}` receives an unknown or mixed asset")]
    UnknownInflow { block_id: String },

    #[error("invalid wrapper contract address `{0}`")]
    InvalidAddress(String),
}

// ── Encoder seam ───────────────────────────────────────────────────

/// One block visit to encode. Amounts are in base units.
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    pub block: &'a Block,
    pub wallet: Address,
    pub asset_in: Option<Asset>,
    pub amount_in: U256,
    pub asset_out: Option<Asset>,
    /// Expected output; used as the minimum for swaps.
    pub amount_out: U256,
}

/// A contract call produced for one block visit, before approvals are added.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCall {
    pub action: StepAction,
    pub protocol: String,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub token_in: Option<TokenAmount>,
    pub token_out: Option<TokenAmount>,
    /// Set when `to` pulls `token_in` via `transferFrom`.
    pub spender: Option<Address>,
}

/// Translates a block visit into contract calls.
pub trait CallEncoder: Send + Sync {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<EncodedCall>, EncodeError>;
}

// ── Contract book ──────────────────────────────────────────────────

/// Protocol entry-point contracts per chain.
#[derive(Debug, Clone)]
pub struct ContractBook {
    entries: HashMap<(u64, Protocol), Address>,
}

impl ContractBook {
    pub fn empty() -> Self {
        ContractBook {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, chain_id: u64, protocol: Protocol, contract: Address) {
        self.entries.insert((chain_id, protocol), contract);
    }

    pub fn get(&self, chain_id: u64, protocol: Protocol) -> Option<Address> {
        self.entries.get(&(chain_id, protocol)).copied()
    }

    fn require(&self, chain_id: u64, protocol: Protocol) -> Result<Address, EncodeError> {
        self.get(chain_id, protocol)
            .ok_or(EncodeError::UnknownContract { protocol, chain_id })
    }
}

impl Default for ContractBook {
    fn default() -> Self {
        use Protocol::*;

        let mut book = ContractBook::empty();
        // ── Ethereum ──
        book.insert(1, Lido, address!("0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"));
        book.insert(1, EtherFi, address!("0x308861A430be4cce5502d0A12724771Fc6DaF216"));
        book.insert(1, RocketPool, address!("0xDD3f50F8A6CafbE9b31a427582963f465E745AF8"));
        book.insert(1, AaveV3, address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"));
        book.insert(1, Spark, address!("0xC13e21B648A5Ee794902342038FF3aDAB66BE987"));
        book.insert(1, CompoundV3, address!("0xc3d688B66703497DAA19211EEdff47f25384cdc3"));
        book.insert(1, UniswapV3, address!("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"));
        // ── Optimism ──
        book.insert(10, AaveV3, address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"));
        book.insert(10, UniswapV3, address!("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"));
        // ── Base ──
        book.insert(8453, AaveV3, address!("0xA238Dd80C7A0845DA4b9e9146FF76C97a7aEcE89"));
        book.insert(8453, CompoundV3, address!("0xb125E6687d4313864e53df431d5425969c15Eb2F"));
        book.insert(8453, UniswapV3, address!("0x2626664c2603336E57B271c5C0b26F421741e481"));
        // ── Arbitrum ──
        book.insert(42161, AaveV3, address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"));
        book.insert(42161, CompoundV3, address!("0x9c4ec768c28520B50860ea7a15bd7213a9fF58bf"));
        book.insert(42161, UniswapV3, address!("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"));
        book
    }
}

// ── ABI encoder ────────────────────────────────────────────────────

/// Default encoder: protocol ABIs via `sol!` over a [`ContractBook`].
#[derive(Debug, Clone, Default)]
pub struct AbiEncoder {
    pub contracts: ContractBook,
}

impl AbiEncoder {
    pub fn new(contracts: ContractBook) -> Self {
        AbiEncoder { contracts }
    }
}

impl CallEncoder for AbiEncoder {
    fn encode(&self, req: &EncodeRequest<'_>) -> Result<Vec<EncodedCall>, EncodeError> {
        let block = req.block;
        let chain_id = block.chain_id;

        let call = match &block.params {
            BlockParams::Input { .. } | BlockParams::Loop { .. } => return Ok(Vec::new()),

            BlockParams::Stake { protocol, asset } => {
                if !asset.is_native() {
                    return Err(unsupported(block, protocol.key(), StepAction::Stake, *asset));
                }
                let to = self.contracts.require(chain_id, *protocol)?;
                let data = match protocol {
                    Protocol::Lido => ILido::submitCall {
                        referral: Address::ZERO,
                    }
                    .abi_encode(),
                    Protocol::EtherFi => IEtherFiLiquidityPool::depositCall {}.abi_encode(),
                    Protocol::RocketPool => IRocketDepositPool::depositCall {}.abi_encode(),
                    other => {
                        return Err(unsupported(block, other.key(), StepAction::Stake, *asset));
                    }
                };
                EncodedCall {
                    action: StepAction::Stake,
                    protocol: protocol.key().to_string(),
                    to,
                    data: data.into(),
                    value: req.amount_in,
                    token_in: Some(native(req.amount_in)),
                    token_out: req
                        .asset_out
                        .map(|a| token_amount(chain_id, a, req.amount_out)),
                    spender: None,
                }
            }

            BlockParams::Lend { protocol, asset } => {
                let token = erc20(block, protocol.key(), StepAction::Supply, *asset)?;
                let to = self.contracts.require(chain_id, *protocol)?;
                let data = match protocol {
                    Protocol::CompoundV3 => IComet::supplyCall {
                        asset: token,
                        amount: req.amount_in,
                    }
                    .abi_encode(),
                    _ => IAavePool::supplyCall {
                        asset: token,
                        amount: req.amount_in,
                        onBehalfOf: req.wallet,
                        referralCode: 0,
                    }
                    .abi_encode(),
                };
                EncodedCall {
                    action: StepAction::Supply,
                    protocol: protocol.key().to_string(),
                    to,
                    data: data.into(),
                    value: U256::ZERO,
                    token_in: Some(TokenAmount {
                        asset: *asset,
                        address: Some(token),
                        amount: req.amount_in,
                    }),
                    token_out: None,
                    spender: Some(to),
                }
            }

            BlockParams::Borrow {
                protocol, asset, ..
            } => {
                let token = erc20(block, protocol.key(), StepAction::Borrow, *asset)?;
                let to = self.contracts.require(chain_id, *protocol)?;
                let data = match protocol {
                    Protocol::CompoundV3 => IComet::withdrawCall {
                        asset: token,
                        amount: req.amount_out,
                    }
                    .abi_encode(),
                    _ => IAavePool::borrowCall {
                        asset: token,
                        amount: req.amount_out,
                        interestRateMode: U256::from(VARIABLE_RATE),
                        referralCode: 0,
                        onBehalfOf: req.wallet,
                    }
                    .abi_encode(),
                };
                EncodedCall {
                    action: StepAction::Borrow,
                    protocol: protocol.key().to_string(),
                    to,
                    data: data.into(),
                    value: U256::ZERO,
                    token_in: None,
                    token_out: Some(TokenAmount {
                        asset: *asset,
                        address: Some(token),
                        amount: req.amount_out,
                    }),
                    spender: None,
                }
            }

            BlockParams::Swap {
                protocol, to_asset, ..
            } => {
                let asset_in = req.asset_in.ok_or_else(|| EncodeError::UnknownInflow {
                    block_id: block.id.clone(),
                })?;
                let router = self.contracts.require(chain_id, *protocol)?;
                // SwapRouter02 wraps msg.value itself when tokenIn is WETH
                let (token_in, value, spender) = if asset_in.is_native() {
                    (weth(chain_id)?, req.amount_in, None)
                } else {
                    let t = erc20(block, protocol.key(), StepAction::Swap, asset_in)?;
                    (t, U256::ZERO, Some(router))
                };
                let token_out = erc20(block, protocol.key(), StepAction::Swap, *to_asset)?;
                let params = ISwapRouter02::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee: U24::from(fee_tier(asset_in, *to_asset)),
                    recipient: req.wallet,
                    amountIn: req.amount_in,
                    amountOutMinimum: req.amount_out,
                    sqrtPriceLimitX96: U160::ZERO,
                };
                EncodedCall {
                    action: StepAction::Swap,
                    protocol: protocol.key().to_string(),
                    to: router,
                    data: ISwapRouter02::exactInputSingleCall { params }
                        .abi_encode()
                        .into(),
                    value,
                    token_in: Some(token_amount(chain_id, asset_in, req.amount_in)),
                    token_out: Some(TokenAmount {
                        asset: *to_asset,
                        address: Some(token_out),
                        amount: req.amount_out,
                    }),
                    spender,
                }
            }

            BlockParams::AutoWrap(wrap) => encode_wrap(block, wrap, req)?,
        };

        Ok(vec![call])
    }
}

fn encode_wrap(
    block: &Block,
    wrap: &WrapStep,
    req: &EncodeRequest<'_>,
) -> Result<EncodedCall, EncodeError> {
    let chain_id = block.chain_id;
    let contract: Address = wrap
        .wrapper_contract
        .parse()
        .map_err(|_| EncodeError::InvalidAddress(wrap.wrapper_contract.clone()))?;
    let wrapped = if wrap.is_wrap {
        wrap.to_asset
    } else {
        wrap.from_asset
    };
    let protocol = wrapped.symbol().to_string();

    let (action, data, value, spender) = match (wrap.is_wrap, wrap.from_asset, wrap.to_asset) {
        (true, from, _) if from.is_native() => (
            StepAction::Wrap,
            IWETH::depositCall {}.abi_encode(),
            req.amount_in,
            None,
        ),
        (false, _, to) if to.is_native() => (
            StepAction::Unwrap,
            IWETH::withdrawCall { wad: req.amount_in }.abi_encode(),
            U256::ZERO,
            None,
        ),
        (true, _, _) => (
            StepAction::Wrap,
            IWrappedToken::wrapCall {
                amount: req.amount_in,
            }
            .abi_encode(),
            U256::ZERO,
            Some(contract),
        ),
        (false, _, _) => (
            StepAction::Unwrap,
            IWrappedToken::unwrapCall {
                amount: req.amount_in,
            }
            .abi_encode(),
            U256::ZERO,
            None,
        ),
    };

    if spender.is_some() && evm::token_address(chain_id, wrap.from_asset).is_none() {
        return Err(EncodeError::UnknownToken {
            asset: wrap.from_asset,
            chain_id,
        });
    }

    Ok(EncodedCall {
        action,
        protocol,
        to: contract,
        data: data.into(),
        value,
        token_in: Some(token_amount(chain_id, wrap.from_asset, req.amount_in)),
        token_out: Some(token_amount(chain_id, wrap.to_asset, req.amount_out)),
        spender,
    })
}

// ── Helpers ────────────────────────────────────────────────────────

/// Uniswap V3 fee tier: 0.01% within a peg family, 0.05% across.
fn fee_tier(a: Asset, b: Asset) -> u32 {
    if a.is_stable() == b.is_stable() { 100 } else { 500 }
}

fn native(amount: U256) -> TokenAmount {
    TokenAmount {
        asset: Asset::ETH,
        address: None,
        amount,
    }
}

fn token_amount(chain_id: u64, asset: Asset, amount: U256) -> TokenAmount {
    TokenAmount {
        asset,
        address: evm::token_address(chain_id, asset),
        amount,
    }
}

fn weth(chain_id: u64) -> Result<Address, EncodeError> {
    evm::token_address(chain_id, Asset::WETH).ok_or(EncodeError::UnknownToken {
        asset: Asset::WETH,
        chain_id,
    })
}

/// ERC-20 address for an asset a protocol has to pull. Native ETH is
/// rejected: lending markets and routers need it wrapped first.
fn erc20(block: &Block, protocol: &str, action: StepAction, asset: Asset) -> Result<Address, EncodeError> {
    if asset.is_native() {
        return Err(unsupported(block, protocol, action, asset));
    }
    evm::token_address(block.chain_id, asset).ok_or(EncodeError::UnknownToken {
        asset,
        chain_id: block.chain_id,
    })
}

fn unsupported(block: &Block, protocol: &str, action: StepAction, asset: Asset) -> EncodeError {
    EncodeError::Unsupported {
        block_id: block.id.clone(),
        protocol: protocol.to_string(),
        action,
        asset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(block: &Block, asset_in: Asset, amount: u64) -> EncodeRequest<'_> {
        EncodeRequest {
            block,
            wallet: Address::repeat_byte(0x11),
            asset_in: Some(asset_in),
            amount_in: U256::from(amount),
            asset_out: None,
            amount_out: U256::from(amount),
        }
    }

    #[test]
    fn aave_supply_pulls_the_supplied_token() {
        let block = Block {
            id: "lend".into(),
            chain_id: 1,
            params: BlockParams::Lend {
                protocol: Protocol::AaveV3,
                asset: Asset::WeEth,
            },
        };
        let calls = AbiEncoder::default()
            .encode(&request(&block, Asset::WeEth, 1_000))
            .unwrap();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.action, StepAction::Supply);
        assert_eq!(call.spender, Some(call.to));
        assert_eq!(&call.data[..4], IAavePool::supplyCall::SELECTOR.as_slice());
        assert_eq!(
            call.token_in.as_ref().and_then(|t| t.address),
            evm::token_address(1, Asset::WeEth)
        );
    }

    #[test]
    fn staking_sends_native_value() {
        let block = Block {
            id: "stake".into(),
            chain_id: 1,
            params: BlockParams::Stake {
                protocol: Protocol::EtherFi,
                asset: Asset::ETH,
            },
        };
        let calls = AbiEncoder::default()
            .encode(&request(&block, Asset::ETH, 5))
            .unwrap();
        assert_eq!(calls[0].value, U256::from(5));
        assert_eq!(calls[0].spender, None);
    }

    #[test]
    fn lending_native_eth_is_rejected() {
        let block = Block {
            id: "lend".into(),
            chain_id: 1,
            params: BlockParams::Lend {
                protocol: Protocol::AaveV3,
                asset: Asset::ETH,
            },
        };
        let err = AbiEncoder::default()
            .encode(&request(&block, Asset::ETH, 5))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Unsupported { .. }));
    }
}
