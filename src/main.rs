//! stakewatch - Gauge Staking Position Aggregator
//!
//! Aggregates a user's liquidity-staking position across reward gauges and
//! derives reward-rate projections: per-gauge payout over the reporting
//! window and a price-denominated yield figure per pool.
//!
//! Run with: cargo run -- status

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use console::style;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod errors;
mod gauges;
mod indexer;
mod position;
mod remote;
mod rewards;
mod session;

use config::Config;
use gauges::eligible_now;
use indexer::SubgraphClient;
use position::{OnchainGaugeFactory, OnchainStakingVault};
use remote::Remote;
use rewards::{parse_decimal, HttpPriceFeed, OnchainInflationOracle, OnchainWeightOracle};
use session::{unix_now, SessionSnapshot, StakingSession};

type Session = StakingSession<
    SubgraphClient,
    OnchainGaugeFactory,
    OnchainStakingVault,
    OnchainWeightOracle,
    OnchainInflationOracle,
    HttpPriceFeed,
>;

#[derive(Parser)]
#[command(name = "stakewatch", about = "Gauge staking position aggregator")]
struct Cli {
    /// Load configuration from a TOML file instead of the environment
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// One-shot refresh and position summary (default)
    Status,
    /// Refresh on an interval and reprint the summary
    Watch,
    /// Stake the full pool-token balance into the pool's gauge
    Stake {
        /// Pool address (falls back to the configured override)
        #[arg(long)]
        pool: Option<String>,
    },
    /// Withdraw the full staked balance from the pool's gauge
    Unstake {
        #[arg(long)]
        pool: Option<String>,
    },
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 📊 STAKEWATCH - Gauge Staking Position Aggregator")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn remote_label<T>(state: &Remote<T>) -> String {
    match state {
        Remote::Idle => style("idle").dim().to_string(),
        Remote::Loading => style("loading").yellow().to_string(),
        Remote::Ready(_) => style("ready").green().to_string(),
        Remote::Failed(err) => style(format!("failed: {err}")).red().to_string(),
    }
}

fn print_snapshot(snapshot: &SessionSnapshot, config: &Config) {
    println!(
        "Pool address:  {}",
        snapshot
            .pool_address
            .map(|p| p.to_string())
            .unwrap_or_else(|| style("(not set)").dim().to_string())
    );
    println!("Pool ids:      {}", remote_label(&snapshot.pool_ids));
    println!("Staking data:  {}", remote_label(&snapshot.staking));
    println!("Eligibility:   {}", remote_label(&snapshot.eligibility));
    if eligible_now(&snapshot.eligibility) {
        println!("               {}", style("pool is stakeable").green());
    }
    if let Some(staking) = snapshot.staking.ready() {
        let total: f64 = staking
            .gauge_shares
            .iter()
            .map(|share| parse_decimal(&share.balance))
            .sum();
        println!("Total staked:  {} BPT across all gauges", style(total).bold());
    }
    println!("Staked shares: {}", remote_label(&snapshot.staked_shares));
    if let Some(shares) = snapshot.staked_shares.ready() {
        println!("               {} BPT", style(shares).bold());
    }

    if snapshot.gauge_set.is_empty() {
        println!("\n{}", style("No gauges discovered.").dim());
        return;
    }

    println!(
        "\n{} gauge(s), {} payout figures:",
        snapshot.gauge_set.len(),
        config.reward_period
    );
    if let Some(rewards) = snapshot.rewards.ready() {
        for gauge in &snapshot.gauge_set {
            let weight = rewards.weights.get(gauge).copied().unwrap_or(0.0);
            let payout = rewards.payouts.get(gauge).copied().unwrap_or(0.0);
            let value = rewards.aprs.get(gauge).copied().unwrap_or(0.0);
            println!(
                "  {}  weight {:.4}  payout {:>14.2}  ${:>12.2}",
                gauge, weight, payout, value
            );
        }
    } else {
        println!("  rewards: {}", remote_label(&snapshot.rewards));
    }

    if let Some(pools) = snapshot.staked_pools.ready() {
        println!("\nStaked pools:");
        for pool in pools {
            println!(
                "  {}  {}  TVL ${}",
                pool.address,
                style(&pool.pool_type).bold(),
                pool.total_liquidity
            );
        }
    }
}

fn build_session(config: &Config) -> Result<Session> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let indexer = SubgraphClient::new(config.subgraph_url.clone(), timeout);
    let factory = OnchainGaugeFactory::new(config.rpc_url.clone(), config.gauge_factory_address()?);
    let vault = OnchainStakingVault::new(config.rpc_url.clone(), config.account_address()?);
    let weights = OnchainWeightOracle::new(config.rpc_url.clone(), config.gauge_controller_address()?);
    let inflation = OnchainInflationOracle::new(config.rpc_url.clone(), config.token_admin_address()?);
    let prices = HttpPriceFeed::new(timeout);

    Ok(StakingSession::new(
        indexer,
        factory,
        vault,
        weights,
        inflation,
        prices,
        config.account_address()?,
        config.reward_token_address()?,
        config.reward_period,
        None,
        unix_now,
    ))
}

fn parse_pool_arg(pool: &Option<String>) -> Result<Option<Address>> {
    pool.as_deref()
        .map(|raw| {
            Address::from_str(raw).map_err(|e| color_eyre::eyre::eyre!("invalid pool address: {e}"))
        })
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stakewatch=info".parse()?),
        )
        .init();

    print_banner();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    let session = build_session(&config)?;
    session.set_pool_address(config.pool_address()?).await;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            session.refresh().await;
            print_snapshot(&session.snapshot().await, &config);
        }
        Command::Watch => {
            let interval = Duration::from_secs(config.refresh_interval_secs);
            info!("watching, refresh every {:?}", interval);
            loop {
                session.refresh().await;
                print_snapshot(&session.snapshot().await, &config);
                tokio::time::sleep(interval).await;
            }
        }
        Command::Stake { pool } => {
            let handle = session.stake(parse_pool_arg(&pool)?).await?;
            println!(
                "{} tx {} (gauge {})",
                style("Stake submitted:").green().bold(),
                handle.hash,
                handle.gauge
            );
            warn!("refetch the position after the transaction confirms");
        }
        Command::Unstake { pool } => {
            let target = parse_pool_arg(&pool)?;
            if let Ok(shares) = session.staked_shares(target).await {
                println!("Withdrawing {} BPT", style(&shares).bold());
            }
            let handle = session.unstake(target).await?;
            println!(
                "{} tx {} (gauge {})",
                style("Unstake submitted:").green().bold(),
                handle.hash,
                handle.gauge
            );
            warn!("refetch the position after the transaction confirms");
        }
    }

    Ok(())
}
