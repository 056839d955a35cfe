use crate::model::{Asset, Block, BlockParams, Edge, Protocol, Strategy};

/// Leveraged restaking on Ethereum: stake ETH with ether.fi, supply the
/// receipt on Aave and borrow WETH against it. The stake emits eETH while
/// Aave takes weETH, so the optimizer has a wrap to insert.
pub fn example_strategy() -> Strategy {
    Strategy {
        name: "ether.fi restaking with Aave leverage".to_string(),
        description: Some(
            "Stake 10 ETH with ether.fi, supply weETH to Aave V3 and \
             borrow WETH at 50% LTV."
                .to_string(),
        ),
        blocks: vec![
            Block {
                id: "input".into(),
                chain_id: 1,
                params: BlockParams::Input {
                    asset: Asset::ETH,
                    amount: 10.0,
                },
            },
            Block {
                id: "stake".into(),
                chain_id: 1,
                params: BlockParams::Stake {
                    protocol: Protocol::EtherFi,
                    asset: Asset::ETH,
                },
            },
            Block {
                id: "lend".into(),
                chain_id: 1,
                params: BlockParams::Lend {
                    protocol: Protocol::AaveV3,
                    asset: Asset::WeEth,
                },
            },
            Block {
                id: "borrow".into(),
                chain_id: 1,
                params: BlockParams::Borrow {
                    protocol: Protocol::AaveV3,
                    asset: Asset::WETH,
                    target_ltv: 0.5,
                },
            },
        ],
        edges: vec![
            Edge::new("e1", "input", "stake", 100.0),
            Edge::new("e2", "stake", "lend", 100.0),
            Edge::new("e3", "lend", "borrow", 100.0),
        ],
    }
}

/// Print the example strategy JSON to stdout.
pub fn run() -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&example_strategy())?;
    println!("{json}");
    Ok(())
}
