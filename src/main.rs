use anyhow::Context;
use clap::Parser;

use strategy_flow::cli::{Cli, Command};
use strategy_flow::commands::{self, plan::PlanArgs};
use strategy_flow::{api, config, example, logging, schema, validate, watch};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level, cli.json_logs);
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Schema => schema::run(),
        Command::Example => example::run(),
        Command::Validate { file } => validate::run(&file),
        Command::Optimize {
            file,
            market,
            output,
        } => commands::optimize::run(&file, market.as_deref(), output.as_deref(), &config),
        Command::Simulate {
            file,
            eth_price,
            market,
            no_optimize,
        } => commands::simulate::run(&file, eth_price, market.as_deref(), no_optimize, &config),
        Command::Plan {
            file,
            wallet,
            eth_price,
            amount,
            market,
            check_approvals,
            output,
        } => runtime()?.block_on(commands::plan::run(
            PlanArgs {
                file: &file,
                wallet: &wallet,
                eth_price,
                amount,
                market: market.as_deref(),
                check_approvals,
                output: output.as_deref(),
            },
            &config,
        )),
        Command::Watch {
            file,
            eth_price,
            market,
        } => {
            let market = commands::load_market(market.as_deref(), &config)?;
            runtime()?.block_on(watch::run(&file, eth_price, &market))
        }
        Command::Serve { host, port, market } => {
            let market = commands::load_market(market.as_deref(), &config)?;
            runtime()?.block_on(api::serve(&host, port, market, config))
        }
        Command::FetchYields { output, market } => runtime()?.block_on(
            commands::fetch_yields::run(&output, market.as_deref(), &config),
        ),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("creating tokio runtime")
}
