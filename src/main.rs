//! Autonomous Polymarket trading controller
//!
//! Scans, evaluates, and trades mispriced binary-market outcomes, and
//! redeems winning positions once markets resolve.

use clap::{Parser, Subcommand};
use poly_autotrader::{
    balance::BalanceTracker,
    chain::{OnchainSettlement, Settlement},
    client::{ApiCredentials, ClobClient, ExchangeApi, GammaClient, MarketDataApi, OrderSigner},
    config::Config,
    controller::AutonomousTradingController,
    evaluator::OpportunityEvaluator,
    executor::TradeExecutor,
    notify::Reporter,
    positions::PositionTracker,
    redemption::RedemptionMonitor,
    scanner::MarketScanner,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "poly-autotrader")]
#[command(about = "Autonomous trading controller for Polymarket prediction markets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading controller and redemption monitor
    Run,
    /// Run one scan cycle and print the opportunities found
    Scan,
    /// Show top markets by volume
    Markets {
        /// Number of markets to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show account balance and open positions
    Status,
    /// Run one redemption sweep over resolved markets
    Redeem,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Scan => scan(config).await,
        Commands::Markets { limit } => show_markets(config, limit).await,
        Commands::Status => show_status(config).await,
        Commands::Redeem => redeem(config).await,
    }
}

fn market_data(config: &Config) -> anyhow::Result<Arc<dyn MarketDataApi>> {
    Ok(Arc::new(GammaClient::new(&config.polymarket.gamma_url)?))
}

fn venue(config: &Config) -> anyhow::Result<Arc<dyn ExchangeApi>> {
    config.require_signing()?;
    let signer = OrderSigner::from_private_key(&config.chain.private_key, config.chain.chain_id)?;
    let credentials = ApiCredentials {
        api_key: config.polymarket.api_key.clone(),
        api_secret: config.polymarket.api_secret.clone(),
        api_passphrase: config.polymarket.api_passphrase.clone(),
    };
    Ok(Arc::new(ClobClient::new(
        &config.polymarket.clob_url,
        signer,
        credentials,
        config.polymarket.address.clone(),
    )?))
}

async fn run(config: Config) -> anyhow::Result<()> {
    config.require_signing()?;
    tracing::info!(
        unsupervised = config.trading.unsupervised_mode,
        "starting trading controller"
    );

    let market_data = market_data(&config)?;
    let venue = venue(&config)?;
    let settlement: Arc<dyn Settlement> =
        Arc::new(OnchainSettlement::new(config.chain.clone())?);
    let reporter = Reporter::new();

    let balance = Arc::new(BalanceTracker::new(
        venue.clone(),
        config.trading.balance_cache_ttl(),
    ));
    let positions = Arc::new(PositionTracker::new(venue.clone()));
    if let Err(e) = positions.load_existing_positions().await {
        tracing::warn!("initial position load failed: {}", e);
    }

    let controller = Arc::new(AutonomousTradingController::new(
        MarketScanner::new(market_data.clone(), config.scanner.clone()),
        OpportunityEvaluator::new(config.trading.clone()),
        TradeExecutor::new(
            venue.clone(),
            settlement.clone(),
            balance.clone(),
            config.trading.clone(),
        ),
        balance,
        positions,
        reporter.clone(),
        config.trading.clone(),
    ));
    controller.start().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = Arc::new(RedemptionMonitor::new(
        venue,
        market_data,
        settlement,
        reporter,
        config.redemption.clone(),
    ));
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    controller.stop().await;
    let _ = shutdown_tx.send(true);
    let _ = monitor_handle.await;
    Ok(())
}

async fn scan(config: Config) -> anyhow::Result<()> {
    let scanner = MarketScanner::new(market_data(&config)?, config.scanner.clone());
    let evaluator = OpportunityEvaluator::new(config.trading.clone());

    let opportunities = scanner.find_opportunities(&HashSet::new()).await?;
    if opportunities.is_empty() {
        println!("No opportunities found");
        return Ok(());
    }
    for opportunity in &opportunities {
        let decision = evaluator.evaluate(opportunity);
        let marker = if decision.should_trade { "*" } else { " " };
        println!(
            "{} {:<10} {:>6}  {}",
            marker, opportunity.outcome, opportunity.current_price, decision.reasoning
        );
    }
    Ok(())
}

async fn show_markets(config: Config, limit: usize) -> anyhow::Result<()> {
    let market_data = market_data(&config)?;
    for market in market_data.get_top_markets(limit).await? {
        println!("{}  {}", market.condition_id, market.question);
        for outcome in &market.outcomes {
            println!("    {:<10} {}", outcome.outcome, outcome.price);
        }
    }
    Ok(())
}

async fn show_status(config: Config) -> anyhow::Result<()> {
    let venue = venue(&config)?;
    let balance = venue.get_balance().await?;
    println!("Address:  {}", venue.address());
    println!("Balance:  {} USDC", balance);

    let positions = venue.get_positions().await?;
    println!("Open positions: {}", positions.len());
    for position in &positions {
        println!(
            "  {:<6} {:>10} @ {:<6} pnl {:>8}  {}",
            position.outcome, position.size, position.avg_price, position.pnl, position.question
        );
    }
    Ok(())
}

async fn redeem(config: Config) -> anyhow::Result<()> {
    let settlement: Arc<dyn Settlement> =
        Arc::new(OnchainSettlement::new(config.chain.clone())?);
    let monitor = RedemptionMonitor::new(
        venue(&config)?,
        market_data(&config)?,
        settlement,
        Reporter::new(),
        config.redemption.clone(),
    );

    let results = monitor.sweep().await;
    if results.is_empty() {
        println!("Nothing to redeem");
    }
    for result in &results {
        if result.success {
            println!(
                "Redeemed {} shares: {} (tx {})",
                result.amount_redeemed,
                result.question,
                result.tx_hash.as_deref().unwrap_or("")
            );
        } else {
            println!(
                "Failed: {} ({})",
                result.question,
                result.error.as_deref().unwrap_or("unknown")
            );
        }
    }
    Ok(())
}
