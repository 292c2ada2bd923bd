use anyhow::Context;
use async_trait::async_trait;
use backtester::{BacktestParams, BacktestResult, Backtester};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::{Candle, Chain};
use engine::LiveTradingOrchestrator;
use events::TradeConfirmation;
use executor::{ExecutionEngine, PaperRoute};
use market_data::{HistoryRequest, MarketDataError, MarketDataSource, MarketSnapshot};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strategies::RuleBasedProvider;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Meridian trading application.
#[tokio::main]
async fn main() {
    // Load environment variables (log filters, future secrets) if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Backtest(args) => handle_backtest(args).await,
        Commands::Paper(args) => handle_paper(args).await,
        Commands::CheckConfig(args) => handle_check_config(args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A modular, non-custodial trading core for crypto strategies.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a strategy over a historical candle series.
    Backtest(RunArgs),
    /// Drive the live orchestrator in paper mode over a candle series,
    /// auto-signing each pending trade at its quoted price.
    Paper(RunArgs),
    /// Load and validate a configuration file, then exit.
    CheckConfig(CheckConfigArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the configuration TOML file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Path to a JSON file holding the candle series (an array of OHLCV
    /// objects, sorted by timestamp).
    #[arg(long)]
    candles: String,

    /// The strategy id from the config to run. Defaults to the first.
    #[arg(long)]
    strategy: Option<String>,

    /// The symbol to run. Defaults to the strategy's first symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Starting equity. Defaults to the strategy's configured value.
    #[arg(long)]
    equity: Option<Decimal>,
}

#[derive(Parser)]
struct CheckConfigArgs {
    /// Path to the configuration TOML file.
    #[arg(long, default_value = "config.toml")]
    config: String,
}

/// Shared setup for both run commands: resolve the strategy, symbol and
/// candle series the caller asked for.
struct RunContext {
    strategy: configuration::StrategyConfig,
    symbol: String,
    initial_equity: Decimal,
    candles: Vec<Candle>,
    execution_settings: configuration::ExecutionSettings,
    decision_settings: configuration::DecisionSettings,
    live_settings: configuration::LiveSettings,
}

fn resolve_run(args: &RunArgs) -> anyhow::Result<RunContext> {
    let config = configuration::load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;

    let strategy = match &args.strategy {
        Some(id) => config
            .strategies
            .iter()
            .find(|s| &s.id == id)
            .with_context(|| format!("strategy '{id}' not found in {}", args.config))?,
        None => config
            .strategies
            .first()
            .context("configuration defines no strategies")?,
    }
    .clone();

    let symbol = args
        .symbol
        .clone()
        .or_else(|| strategy.symbols.first().cloned())
        .context("strategy has no symbols")?;
    let initial_equity = args.equity.unwrap_or(strategy.initial_equity);

    let raw = std::fs::read_to_string(&args.candles)
        .with_context(|| format!("reading candle series from {}", args.candles))?;
    let candles: Vec<Candle> =
        serde_json::from_str(&raw).context("parsing the candle series JSON")?;

    Ok(RunContext {
        strategy,
        symbol,
        initial_equity,
        candles,
        execution_settings: config.execution,
        decision_settings: config.decision,
        live_settings: config.live,
    })
}

// ==============================================================================
// Backtest Command
// ==============================================================================

async fn handle_backtest(args: RunArgs) -> anyhow::Result<()> {
    let run = resolve_run(&args)?;

    println!(
        "Backtesting '{}' on {} over {} candles...",
        run.strategy.id,
        run.symbol,
        run.candles.len()
    );

    let result = Backtester::new(None, None)
        .run(BacktestParams {
            strategy: run.strategy,
            symbol: run.symbol,
            candles: run.candles,
            initial_equity: run.initial_equity,
            fast_mode: true,
            snapshot_every_trades: 0,
        })
        .await?;

    print_report(&result);
    Ok(())
}

// ==============================================================================
// Paper Command
// ==============================================================================

/// Serves a recorded candle series one bar per poll, so the live
/// orchestrator can be driven deterministically without an upstream feed.
struct ReplayFeed {
    candles: Mutex<VecDeque<Candle>>,
}

impl ReplayFeed {
    fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles: Mutex::new(candles.into()),
        }
    }
}

#[async_trait]
impl MarketDataSource for ReplayFeed {
    async fn get_latest_snapshot(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _chain: Chain,
    ) -> Result<Option<MarketSnapshot>, MarketDataError> {
        let candle = self
            .candles
            .lock()
            .map_err(|_| MarketDataError::Upstream("replay feed poisoned".to_string()))?
            .pop_front();
        Ok(candle.map(|candle| MarketSnapshot {
            candle,
            vwap: None,
            dex_volume_usd_24h: None,
        }))
    }

    async fn get_historical_candles(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<Candle>, MarketDataError> {
        Err(MarketDataError::NoData(request.symbol.clone()))
    }
}

async fn handle_paper(args: RunArgs) -> anyhow::Result<()> {
    let mut run = resolve_run(&args)?;
    run.strategy.initial_equity = run.initial_equity;
    let strategy_id = run.strategy.id.clone();
    let bars = run.candles.len();

    let execution = Arc::new(ExecutionEngine::new(
        vec![Arc::new(PaperRoute::default())],
        Duration::from_millis(run.execution_settings.route_backoff_ms),
    ));
    let orchestrator = LiveTradingOrchestrator::new(
        Arc::new(ReplayFeed::new(run.candles)),
        Arc::new(RuleBasedProvider),
        execution,
        None,
        None,
        run.decision_settings,
        run.execution_settings,
        run.live_settings,
    );

    println!("Paper session for '{strategy_id}' on {} over {bars} bars...", run.symbol);
    orchestrator.start(run.strategy).await?;

    let mut signed = 0usize;
    for i in 0..bars {
        orchestrator.tick_now(&strategy_id).await?;

        // Stand in for the external signer: sign at the quoted price.
        if let Some(pending) = orchestrator.get_pending_trade(&strategy_id).await {
            let trade = orchestrator
                .record_trade(
                    &strategy_id,
                    TradeConfirmation {
                        tx_signature: format!("paper-{i}"),
                        executed_price: pending.price,
                        executed_size: pending.size,
                        fees: Decimal::ZERO,
                        submitted_at: Utc::now(),
                    },
                )
                .await?;
            signed += 1;
            match trade.exit_price {
                Some(exit) => println!(
                    "  closed {:?} {} {} @ {} -> {} (pnl {})",
                    trade.side, trade.size, trade.symbol, trade.entry_price, exit, trade.pnl
                ),
                None => println!(
                    "  opened {:?} {} {} @ {}",
                    trade.side, trade.size, trade.symbol, trade.entry_price
                ),
            }
        }
    }

    orchestrator.stop(&strategy_id).await?;
    println!("Paper session complete: {signed} trades signed.");
    Ok(())
}

// ==============================================================================
// Check-Config Command
// ==============================================================================

fn handle_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = configuration::load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    println!(
        "Configuration OK: {} strategies defined.",
        config.strategies.len()
    );
    for strategy in &config.strategies {
        println!(
            "  - {} ({:?}, {} symbols, {} timeframe)",
            strategy.id,
            strategy.chain,
            strategy.symbols.len(),
            strategy.timeframe
        );
    }
    Ok(())
}

fn print_report(result: &BacktestResult) {
    let report = &result.report;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        "Initial Equity".to_string(),
        result.initial_equity.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Final Equity".to_string(),
        result.final_equity.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Total Return %".to_string(),
        report.total_return_pct.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Max Drawdown %".to_string(),
        report.max_drawdown_pct.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Sharpe".to_string(),
        report.sharpe.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Total Trades".to_string(),
        report.total_trades.to_string(),
    ]);
    table.add_row(vec![
        "Win Rate %".to_string(),
        (report.win_rate * Decimal::from(100)).round_dp(1).to_string(),
    ]);
    table.add_row(vec![
        "Payoff Ratio".to_string(),
        report.payoff_ratio.round_dp(2).to_string(),
    ]);
    println!("{table}");
}
