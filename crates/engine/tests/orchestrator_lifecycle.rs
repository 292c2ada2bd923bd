//! Lifecycle and tick-cycle scenarios against stubbed collaborators.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::{
    DecisionSettings, ExecutionSettings, LiveSettings, RiskLimits, RuleParams, StrategyConfig,
    TradingCosts,
};
use core_types::{Candle, Chain, Decision, DecisionAction};
use engine::{EngineError, LiveTradingOrchestrator};
use events::TradeConfirmation;
use executor::{ExecutionEngine, PaperRoute};
use market_data::{HistoryRequest, MarketDataError, MarketDataSource, MarketSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strategies::{DecisionProvider, MarketContext, StrategyError};

/// Serves one flat candle per call, each a minute later than the last.
struct FlatFeed {
    seq: AtomicI64,
}

impl FlatFeed {
    fn new() -> Self {
        Self {
            seq: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl MarketDataSource for FlatFeed {
    async fn get_latest_snapshot(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _chain: Chain,
    ) -> Result<Option<MarketSnapshot>, MarketDataError> {
        let i = self.seq.fetch_add(1, Ordering::SeqCst);
        let price = dec!(100);
        Ok(Some(MarketSnapshot {
            candle: Candle {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i * 60, 0).unwrap(),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: dec!(1000),
            },
            vwap: None,
            dex_volume_usd_24h: None,
        }))
    }

    async fn get_historical_candles(
        &self,
        _request: &HistoryRequest,
    ) -> Result<Vec<Candle>, MarketDataError> {
        Ok(Vec::new())
    }
}

/// Always wants a full-size long, and counts how often it is consulted.
struct CountingLongProvider {
    calls: AtomicU32,
}

#[async_trait]
impl DecisionProvider for CountingLongProvider {
    async fn decide(
        &self,
        _context: &MarketContext,
        _config: &StrategyConfig,
    ) -> Result<Decision, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Decision {
            action: DecisionAction::Long,
            confidence: Decimal::ONE,
            target_position_size_pct: dec!(100),
            notes: "stub".to_string(),
        })
    }
}

fn strategy_config(id: &str, chain: Chain) -> StrategyConfig {
    StrategyConfig {
        id: id.to_string(),
        symbols: vec!["SOL/USDC".to_string()],
        timeframe: "1h".to_string(),
        chain,
        initial_equity: dec!(1000),
        risk: RiskLimits {
            max_position_pct: dec!(100),
            max_daily_loss_pct: dec!(5),
            stop_loss_pct: None,
            take_profit_pct: None,
            trailing_stop_pct: None,
            max_leverage: None,
            kelly_fraction_cap_pct: None,
            max_drawdown_pct: None,
        },
        costs: TradingCosts::default(),
        rule: RuleParams::default(),
    }
}

fn orchestrator(provider: Arc<dyn DecisionProvider>) -> LiveTradingOrchestrator {
    let execution = Arc::new(ExecutionEngine::new(
        vec![Arc::new(PaperRoute::default())],
        Duration::ZERO,
    ));
    LiveTradingOrchestrator::new(
        Arc::new(FlatFeed::new()),
        provider,
        execution,
        None,
        None,
        DecisionSettings::default(),
        ExecutionSettings::default(),
        LiveSettings::default(),
    )
}

fn counting_provider() -> Arc<CountingLongProvider> {
    Arc::new(CountingLongProvider {
        calls: AtomicU32::new(0),
    })
}

/// Drives ticks until a pending trade exists (the indicator buffer needs to
/// warm up first).
async fn drive_until_pending(orch: &LiveTradingOrchestrator, id: &str) {
    for _ in 0..30 {
        orch.tick_now(id).await.unwrap();
        if orch.get_pending_trade(id).await.is_some() {
            return;
        }
    }
    panic!("no pending trade after 30 ticks");
}

#[tokio::test]
async fn starting_the_same_strategy_twice_fails() {
    let orch = orchestrator(counting_provider());
    orch.start(strategy_config("alpha", Chain::Evm)).await.unwrap();
    match orch.start(strategy_config("alpha", Chain::Evm)).await {
        Err(EngineError::StrategyAlreadyRunning(id)) => assert_eq!(id, "alpha"),
        other => panic!("expected StrategyAlreadyRunning, got {other:?}"),
    }
}

#[tokio::test]
async fn solana_strategies_refuse_to_start_while_the_gate_is_off() {
    let orch = orchestrator(counting_provider());
    match orch.start(strategy_config("sol-alpha", Chain::Solana)).await {
        Err(EngineError::LiveSolanaDisabled(id)) => assert_eq!(id, "sol-alpha"),
        other => panic!("expected LiveSolanaDisabled, got {other:?}"),
    }
}

#[tokio::test]
async fn a_warmed_up_long_decision_produces_a_pending_trade() {
    let orch = orchestrator(counting_provider());
    orch.start(strategy_config("alpha", Chain::Evm)).await.unwrap();
    drive_until_pending(&orch, "alpha").await;

    let pending = orch.get_pending_trade("alpha").await.unwrap();
    assert_eq!(pending.strategy_id, "alpha");
    assert_eq!(pending.symbol, "SOL/USDC");
    // 100% of 1000 equity at price 100.
    assert_eq!(pending.size, dec!(10));
}

#[tokio::test]
async fn stop_drops_the_pending_trade() {
    let orch = orchestrator(counting_provider());
    orch.start(strategy_config("alpha", Chain::Evm)).await.unwrap();
    drive_until_pending(&orch, "alpha").await;
    assert!(orch.get_pending_trade("alpha").await.is_some());

    orch.stop("alpha").await.unwrap();
    assert!(orch.get_pending_trade("alpha").await.is_none());

    match orch.stop("alpha").await {
        Err(EngineError::StrategyNotRunning(_)) => {}
        other => panic!("expected StrategyNotRunning, got {other:?}"),
    }
}

#[tokio::test]
async fn record_trade_clears_the_slot_and_appends_the_trade() {
    let orch = orchestrator(counting_provider());
    orch.start(strategy_config("alpha", Chain::Evm)).await.unwrap();
    drive_until_pending(&orch, "alpha").await;

    let confirmation = TradeConfirmation {
        tx_signature: "sig-1".to_string(),
        executed_price: dec!(100),
        executed_size: dec!(10),
        fees: Decimal::ZERO,
        submitted_at: Utc::now(),
    };
    let trade = orch.record_trade("alpha", confirmation.clone()).await.unwrap();
    assert_eq!(trade.entry_price, dec!(100));
    assert_eq!(trade.exit_price, None);
    assert!(orch.get_pending_trade("alpha").await.is_none());

    match orch.record_trade("alpha", confirmation).await {
        Err(EngineError::NoPendingTrade(_)) => {}
        other => panic!("expected NoPendingTrade, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unchanged_regime_reuses_the_cached_decision() {
    let provider = counting_provider();
    let orch = orchestrator(provider.clone());
    orch.start(strategy_config("alpha", Chain::Evm)).await.unwrap();

    // Warm up past the indicator window, then tick several more times in
    // the same flat regime.
    for _ in 0..28 {
        orch.tick_now("alpha").await.unwrap();
    }

    // The provider is consulted once; every later tick hits the cache.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
