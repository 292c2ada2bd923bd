//! # Meridian Live Trading Engine
//!
//! The orchestrator for live and paper trading: one timer-driven task per
//! active strategy, each running the tick cycle `FetchSnapshot →
//! ComputeIndicators → ResolveDecision → Admit → BuildOrder → Record`.
//!
//! All per-strategy state (candle buffers, cached decision, pending trade,
//! positions, daily-loss window) lives in an explicit map owned by the
//! orchestrator object, constructed once and started and stopped explicitly,
//! with no module-level singletons. Ticks for different strategies are
//! independent; two ticks for the *same* strategy can never overlap (a tick
//! that would overlap a still-running one is dropped, not queued).

use analytics::AnalyticsEngine;
use chrono::Utc;
use configuration::{
    parse_timeframe, DecisionSettings, ExecutionSettings, LiveSettings, StrategyConfig,
};
use core_types::{
    Candle, Chain, Decision, DecisionAction, PendingTrade, Position, Trade, TradeSide, TwapChunk,
    UnsignedOrder,
};
use events::{PersistenceSink, TradeConfirmation};
use executor::{ExecutionEngine, ExecutionOptions, QuoteParams};
use indicators::{regime_hash, IndicatorSnapshot, MIN_BARS};
use market_data::MarketDataSource;
use risk::{DailyLossTracker, ProposedTrade};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use strategies::{rule_based, DecisionProvider, MarketContext};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use uuid::Uuid;

pub mod cache;
pub mod confirm;
pub mod error;

pub use cache::CachedDecision;
pub use confirm::{ConfirmationDetails, ConfirmationSource};
pub use error::EngineError;

/// Candle buffer capacity per symbol; the oldest bar drops off the back.
const BUFFER_CAP: usize = 100;

/// Ceiling on one market-data fetch, so a slow upstream cannot stall a tick.
const MARKET_DATA_TIMEOUT_SECS: u64 = 10;

/// Everything a strategy task owns.
struct StrategyRuntime {
    config: StrategyConfig,
    /// Single-flight guard: a tick that cannot take it is dropped.
    tick_guard: Mutex<()>,
    buffers: Mutex<HashMap<String, VecDeque<Candle>>>,
    positions: Mutex<HashMap<String, Position>>,
    pending: Mutex<Option<PendingTrade>>,
    cached: Mutex<Option<CachedDecision>>,
    daily: Mutex<DailyLossTracker>,
    equity: Mutex<Decimal>,
    peak_equity: Mutex<Decimal>,
    max_drawdown_pct: Mutex<Decimal>,
    trades: Mutex<Vec<Trade>>,
    recent_returns: Mutex<Vec<Decimal>>,
}

impl StrategyRuntime {
    fn new(config: StrategyConfig) -> Self {
        let equity = config.initial_equity;
        Self {
            config,
            tick_guard: Mutex::new(()),
            buffers: Mutex::new(HashMap::new()),
            positions: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
            cached: Mutex::new(None),
            daily: Mutex::new(DailyLossTracker::new()),
            equity: Mutex::new(equity),
            peak_equity: Mutex::new(equity),
            max_drawdown_pct: Mutex::new(Decimal::ZERO),
            trades: Mutex::new(Vec::new()),
            recent_returns: Mutex::new(Vec::new()),
        }
    }
}

/// A running strategy: its timer task, cancellation channel and state.
struct StrategyHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
    runtime: Arc<StrategyRuntime>,
}

/// The shared collaborators every tick uses.
struct TickDeps {
    market_data: Arc<dyn MarketDataSource>,
    decider: Arc<dyn DecisionProvider>,
    execution: Arc<ExecutionEngine>,
    confirmations: Option<Arc<dyn ConfirmationSource>>,
    sink: Option<Arc<dyn PersistenceSink>>,
    analytics: AnalyticsEngine,
    decision_settings: DecisionSettings,
    execution_settings: ExecutionSettings,
    live_settings: LiveSettings,
}

/// The central orchestrator for live trading.
pub struct LiveTradingOrchestrator {
    deps: Arc<TickDeps>,
    strategies: Mutex<HashMap<String, StrategyHandle>>,
}

impl LiveTradingOrchestrator {
    pub fn new(
        market_data: Arc<dyn MarketDataSource>,
        decider: Arc<dyn DecisionProvider>,
        execution: Arc<ExecutionEngine>,
        confirmations: Option<Arc<dyn ConfirmationSource>>,
        sink: Option<Arc<dyn PersistenceSink>>,
        decision_settings: DecisionSettings,
        execution_settings: ExecutionSettings,
        live_settings: LiveSettings,
    ) -> Self {
        Self {
            deps: Arc::new(TickDeps {
                market_data,
                decider,
                execution,
                confirmations,
                sink,
                analytics: AnalyticsEngine::new(),
                decision_settings,
                execution_settings,
                live_settings,
            }),
            strategies: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a recurring tick task for the strategy.
    ///
    /// Fails fast on invalid configuration, on a duplicate start, and on the
    /// global live-Solana safety gate.
    pub async fn start(&self, config: StrategyConfig) -> Result<(), EngineError> {
        config.validate()?;
        if config.chain == Chain::Solana && !self.deps.live_settings.live_solana_enabled {
            return Err(EngineError::LiveSolanaDisabled(config.id));
        }

        let period = parse_timeframe(&config.timeframe)?;
        let mut strategies = self.strategies.lock().await;
        if strategies.contains_key(&config.id) {
            return Err(EngineError::StrategyAlreadyRunning(config.id));
        }

        let strategy_id = config.id.clone();
        let runtime = Arc::new(StrategyRuntime::new(config));
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let deps = Arc::clone(&self.deps);
        let task_runtime = Arc::clone(&runtime);
        let task_id = strategy_id.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            // A tick that fires while the previous one is still running is
            // dropped, never queued; backlog must stay bounded.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            tracing::info!(strategy = %task_id, "strategy task stopping");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        run_tick(&deps, &task_runtime).await;
                    }
                }
            }
        });

        tracing::info!(strategy = %strategy_id, "strategy started");
        strategies.insert(
            strategy_id,
            StrategyHandle {
                cancel: cancel_tx,
                task,
                runtime,
            },
        );
        Ok(())
    }

    /// Stops a running strategy, dropping its pending trade and cached
    /// decision. Safe to call while a tick is in flight: the in-flight tick
    /// finishes, but none of its state remains visible afterwards.
    pub async fn stop(&self, strategy_id: &str) -> Result<(), EngineError> {
        let handle = {
            let mut strategies = self.strategies.lock().await;
            strategies
                .remove(strategy_id)
                .ok_or_else(|| EngineError::StrategyNotRunning(strategy_id.to_string()))?
        };

        let _ = handle.cancel.send(true);
        let _ = handle.task.await;

        // The handle owns the last reference visible to callers; clearing
        // these keeps even a lingering Arc from exposing stale artifacts.
        *handle.runtime.pending.lock().await = None;
        *handle.runtime.cached.lock().await = None;

        tracing::info!(strategy = strategy_id, "strategy stopped");
        Ok(())
    }

    /// Read-only peek at the current unsigned artifact, if any.
    pub async fn get_pending_trade(&self, strategy_id: &str) -> Option<PendingTrade> {
        let strategies = self.strategies.lock().await;
        let handle = strategies.get(strategy_id)?;
        handle.runtime.pending.lock().await.clone()
    }

    /// Records a signed trade against the pending artifact: clears the slot,
    /// appends the completed trade, settles equity/daily accounting and
    /// kicks off the bounded confirmation poll.
    pub async fn record_trade(
        &self,
        strategy_id: &str,
        confirmation: TradeConfirmation,
    ) -> Result<Trade, EngineError> {
        let (runtime, cancel_rx) = {
            let strategies = self.strategies.lock().await;
            let handle = strategies
                .get(strategy_id)
                .ok_or_else(|| EngineError::StrategyNotRunning(strategy_id.to_string()))?;
            (Arc::clone(&handle.runtime), handle.cancel.subscribe())
        };

        let pending = runtime
            .pending
            .lock()
            .await
            .take()
            .ok_or_else(|| EngineError::NoPendingTrade(strategy_id.to_string()))?;

        let trade = settle_recorded_trade(&runtime, &pending, &confirmation).await;
        if let Some(sink) = &self.deps.sink {
            sink.on_trade(&trade);
            self.emit_snapshot(&runtime, &trade).await;
        }

        if let Some(source) = &self.deps.confirmations {
            let poll = confirm::poll_confirmation(
                Arc::clone(source),
                confirmation.tx_signature.clone(),
                pending.price,
                Duration::from_secs(self.deps.live_settings.confirmation_poll_secs),
                Duration::from_secs(self.deps.live_settings.confirmation_timeout_secs),
                cancel_rx,
            );
            tokio::spawn(poll);
        }

        Ok(trade)
    }

    /// Runs one tick cycle immediately, honoring the single-flight guard.
    /// The timer task runs exactly this; exposing it lets callers (and
    /// tests) drive a strategy without waiting out its timeframe.
    pub async fn tick_now(&self, strategy_id: &str) -> Result<(), EngineError> {
        let runtime = {
            let strategies = self.strategies.lock().await;
            let handle = strategies
                .get(strategy_id)
                .ok_or_else(|| EngineError::StrategyNotRunning(strategy_id.to_string()))?;
            Arc::clone(&handle.runtime)
        };
        run_tick(&self.deps, &runtime).await;
        Ok(())
    }

    async fn emit_snapshot(&self, runtime: &StrategyRuntime, trade: &Trade) {
        let trades = runtime.trades.lock().await;
        let equity = *runtime.equity.lock().await;
        let snapshot = self.deps.analytics.snapshot(
            trade.timestamp,
            equity,
            &trades,
            &[],
            runtime.config.initial_equity,
        );
        match snapshot {
            Ok(snapshot) => {
                if let Some(sink) = &self.deps.sink {
                    sink.on_snapshot(&snapshot);
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to build performance snapshot"),
        }
    }
}

/// One full tick across the strategy's symbol universe. Any per-symbol error
/// is caught and logged; it never stops the loop or other strategies.
async fn run_tick(deps: &Arc<TickDeps>, runtime: &Arc<StrategyRuntime>) {
    let Ok(_guard) = runtime.tick_guard.try_lock() else {
        tracing::warn!(
            strategy = %runtime.config.id,
            "previous tick still running, dropping this one"
        );
        return;
    };

    for symbol in runtime.config.symbols.clone() {
        if let Err(e) = tick_symbol(deps, runtime, &symbol).await {
            tracing::error!(
                strategy = %runtime.config.id,
                symbol = %symbol,
                error = %e,
                "tick failed for symbol"
            );
        }
    }
}

async fn tick_symbol(
    deps: &Arc<TickDeps>,
    runtime: &Arc<StrategyRuntime>,
    symbol: &str,
) -> Result<(), EngineError> {
    let config = &runtime.config;

    // --- FetchSnapshot ---
    let fetch = deps
        .market_data
        .get_latest_snapshot(symbol, &config.timeframe, config.chain);
    let snapshot = match timeout(Duration::from_secs(MARKET_DATA_TIMEOUT_SECS), fetch).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(market_data::MarketDataError::Upstream(format!(
                "snapshot fetch for {symbol} timed out"
            ))
            .into());
        }
    };
    let Some(snapshot) = snapshot else {
        tracing::debug!(symbol, "no market snapshot yet");
        return Ok(());
    };
    let candle = snapshot.candle;

    // --- Buffer + ComputeIndicators ---
    let window: Vec<Candle> = {
        let mut buffers = runtime.buffers.lock().await;
        let buffer = buffers.entry(symbol.to_string()).or_default();
        if buffer.back().map(|c| c.timestamp) != Some(candle.timestamp) {
            buffer.push_back(candle.clone());
            if buffer.len() > BUFFER_CAP {
                buffer.pop_front();
            }
        }
        buffer.iter().cloned().collect()
    };
    if window.len() < MIN_BARS {
        tracing::debug!(symbol, bars = window.len(), "warming up indicator window");
        return Ok(());
    }
    let indicators = IndicatorSnapshot::compute(&window)?;

    runtime.daily.lock().await.observe(candle.timestamp);

    // --- ResolveDecision ---
    let decision = resolve_decision(deps, runtime, symbol, &candle, &indicators, &window).await?;

    // --- Admit + BuildOrder ---
    apply_decision(deps, runtime, symbol, &candle, &decision).await
}

/// Resolves this tick's decision: hard daily-loss short-circuit first, then
/// the cache, then the provider under its timeout with the rule-based
/// fallback.
async fn resolve_decision(
    deps: &Arc<TickDeps>,
    runtime: &Arc<StrategyRuntime>,
    symbol: &str,
    candle: &Candle,
    indicators: &IndicatorSnapshot,
    window: &[Candle],
) -> Result<Decision, EngineError> {
    let config = &runtime.config;

    let (daily_pnl, equity) = {
        let daily = runtime.daily.lock().await;
        (daily.daily_pnl(), *runtime.equity.lock().await)
    };
    if risk::is_daily_loss_limit_exceeded(daily_pnl, equity, config.risk.max_daily_loss_pct) {
        // Hard short-circuit: no cache lookup, no provider call.
        tracing::warn!(
            strategy = %config.id,
            %daily_pnl,
            "daily loss limit breached, forcing flat"
        );
        return Ok(Decision::forced_flat("daily loss limit breached"));
    }

    let regime = regime_hash(candle.close, indicators);
    let now = Utc::now();
    {
        let cached = runtime.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.is_fresh(
                symbol,
                regime,
                now,
                deps.decision_settings.min_redecision_interval_secs,
            ) {
                tracing::debug!(strategy = %config.id, symbol, "decision cache hit");
                return Ok(entry.decision.clone());
            }
        }
    }

    let context = MarketContext {
        symbol: symbol.to_string(),
        price: candle.close,
        indicators: indicators.clone(),
        candles: window.to_vec(),
        open_position: runtime.positions.lock().await.get(symbol).cloned(),
    };
    let provider_timeout = Duration::from_secs(deps.decision_settings.provider_timeout_secs);
    let decision = match timeout(provider_timeout, deps.decider.decide(&context, config)).await {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => {
            tracing::warn!(
                strategy = %config.id,
                error = %e,
                "decision provider failed, degrading to rule-based decision"
            );
            rule_based::decide(indicators, &config.rule)
        }
        Err(_) => {
            tracing::warn!(
                strategy = %config.id,
                timeout_secs = deps.decision_settings.provider_timeout_secs,
                "decision provider timed out, degrading to rule-based decision"
            );
            rule_based::decide(indicators, &config.rule)
        }
    };

    *runtime.cached.lock().await = Some(CachedDecision {
        symbol: symbol.to_string(),
        decision: decision.clone(),
        regime,
        decided_at: now,
    });
    Ok(decision)
}

/// Applies a resolved decision: exits close the open position, entries pass
/// sizing and admission; either path builds an unsigned order into the
/// single pending-trade slot.
async fn apply_decision(
    deps: &Arc<TickDeps>,
    runtime: &Arc<StrategyRuntime>,
    symbol: &str,
    candle: &Candle,
    decision: &Decision,
) -> Result<(), EngineError> {
    let config = &runtime.config;

    if runtime.pending.lock().await.is_some() {
        tracing::debug!(
            strategy = %config.id,
            "pending trade awaiting signature, skipping order build"
        );
        return Ok(());
    }

    let open_position = runtime.positions.lock().await.get(symbol).cloned();
    let (side, size) = match &open_position {
        Some(position) => {
            let wants_exit = decision.action == DecisionAction::Flat
                || decision.action.side() == Some(position.side.opposite());
            if !wants_exit {
                return Ok(());
            }
            (position.side.opposite(), position.size)
        }
        None => {
            let Some(side) = decision.action.side() else {
                return Ok(());
            };
            let Some(size) = admit_entry(runtime, symbol, side, decision, candle).await else {
                return Ok(());
            };
            (side, size)
        }
    };

    let (unsigned_order, quote_price, built_size) =
        build_order(deps, config, symbol, side, size, candle.close).await?;

    *runtime.pending.lock().await = Some(PendingTrade {
        strategy_id: config.id.clone(),
        symbol: symbol.to_string(),
        side,
        size: built_size,
        price: quote_price,
        unsigned_order,
        created_at: Utc::now(),
    });
    tracing::info!(
        strategy = %config.id,
        symbol = %symbol,
        ?side,
        %built_size,
        "pending trade ready for signature"
    );
    Ok(())
}

/// Sizing plus the admission gate for a prospective entry.
async fn admit_entry(
    runtime: &Arc<StrategyRuntime>,
    symbol: &str,
    side: TradeSide,
    decision: &Decision,
    candle: &Candle,
) -> Option<Decimal> {
    let config = &runtime.config;
    let limits = &config.risk;
    let equity = *runtime.equity.lock().await;

    let mut target_pct = decision.target_position_size_pct;
    if let Some(cap) = limits.kelly_fraction_cap_pct {
        let trades = runtime.trades.lock().await;
        if let Some(kelly_pct) = kelly_bound(&trades, cap) {
            target_pct = target_pct.min(kelly_pct);
        }
    }

    let size = risk::clamp_position_size(target_pct, equity, candle.close, limits);
    if size <= Decimal::ZERO {
        return None;
    }

    let positions = runtime.positions.lock().await.clone();
    let daily_pnl = runtime.daily.lock().await.daily_pnl();
    let recent_returns = runtime.recent_returns.lock().await.clone();
    let max_drawdown_pct = *runtime.max_drawdown_pct.lock().await;

    let proposed = ProposedTrade {
        symbol: symbol.to_string(),
        side,
        size,
        price: candle.close,
    };
    let admitted = risk::should_take_trade(
        equity,
        daily_pnl,
        &proposed,
        &positions,
        limits,
        &recent_returns,
        max_drawdown_pct,
    );
    if !admitted {
        tracing::debug!(strategy = %config.id, symbol, %size, "entry rejected by risk admission");
        return None;
    }
    Some(size)
}

/// Builds the unsigned artifact for an admitted order, splitting into a TWAP
/// schedule above the notional threshold. Chunk swaps are built upfront (the
/// schedule's delays ride along for the signer to honor); a chunk whose
/// build fails degrades the schedule rather than failing the order.
async fn build_order(
    deps: &Arc<TickDeps>,
    config: &StrategyConfig,
    symbol: &str,
    side: TradeSide,
    size: Decimal,
    price: Decimal,
) -> Result<(UnsignedOrder, Decimal, Decimal), EngineError> {
    let params = QuoteParams {
        symbol: symbol.to_string(),
        side,
        size,
        price_hint: price,
        chain: config.chain,
    };
    let options = ExecutionOptions {
        gasless_enabled: deps.execution_settings.gasless_enabled,
    };
    let split_config = &deps.execution_settings.split;

    if !executor::should_split_order(size, price, split_config) {
        let result = deps.execution.execute_trade(&params, &options).await?;
        return Ok((UnsignedOrder::Single(result.swap), result.quote.price, size));
    }

    let chunks = executor::split_order(&params, split_config);
    let mut twap = Vec::with_capacity(chunks.len());
    let mut built_size = Decimal::ZERO;
    let mut quote_price = price;
    let mut last_error: Option<executor::ExecutorError> = None;

    for chunk in chunks {
        let chunk_params = QuoteParams {
            size: chunk.amount,
            ..params.clone()
        };
        match deps.execution.execute_trade(&chunk_params, &options).await {
            Ok(result) => {
                if twap.is_empty() {
                    quote_price = result.quote.price;
                }
                built_size += chunk.amount;
                twap.push(TwapChunk {
                    swap: result.swap,
                    amount: chunk.amount,
                    delay_ms: chunk.delay_ms,
                });
            }
            Err(e) => {
                tracing::warn!(chunk = chunk.index, error = %e, "chunk build failed, continuing");
                last_error = Some(e);
            }
        }
    }

    if twap.is_empty() {
        return Err(last_error
            .unwrap_or(executor::ExecutorError::NoRoutesAvailable)
            .into());
    }
    Ok((UnsignedOrder::Twap(twap), quote_price, built_size))
}

/// Turns a signed pending trade plus its confirmation into a ledger entry,
/// updating positions, equity and the daily-loss window.
async fn settle_recorded_trade(
    runtime: &Arc<StrategyRuntime>,
    pending: &PendingTrade,
    confirmation: &TradeConfirmation,
) -> Trade {
    let mut positions = runtime.positions.lock().await;
    let existing = positions.get(&pending.symbol).cloned();

    let trade = match existing {
        // Closing the open position: realize PnL.
        Some(position) if position.side == pending.side.opposite() => {
            positions.remove(&pending.symbol);

            let direction = Decimal::from(position.side.sign());
            let pnl = (confirmation.executed_price - position.entry_price)
                * confirmation.executed_size
                * direction
                - confirmation.fees;
            let entry_notional = position.entry_price * confirmation.executed_size;
            let pnl_pct = if entry_notional > Decimal::ZERO {
                pnl / entry_notional * dec!(100)
            } else {
                Decimal::ZERO
            };

            let mut equity = runtime.equity.lock().await;
            *equity += pnl;
            let mut daily = runtime.daily.lock().await;
            daily.observe(confirmation.submitted_at);
            daily.record(pnl);
            runtime.recent_returns.lock().await.push(pnl_pct / dec!(100));

            let mut peak = runtime.peak_equity.lock().await;
            if *equity > *peak {
                *peak = *equity;
            }
            if *peak > Decimal::ZERO {
                let dd = (*peak - *equity) / *peak * dec!(100);
                let mut max_dd = runtime.max_drawdown_pct.lock().await;
                if dd > *max_dd {
                    *max_dd = dd;
                }
            }

            Trade {
                trade_id: Uuid::new_v4(),
                strategy_id: pending.strategy_id.clone(),
                timestamp: confirmation.submitted_at,
                symbol: pending.symbol.clone(),
                side: position.side,
                size: confirmation.executed_size,
                entry_price: position.entry_price,
                exit_price: Some(confirmation.executed_price),
                fees: confirmation.fees,
                slippage: Decimal::ZERO,
                pnl,
                pnl_pct,
            }
        }
        // Opening (or the degenerate same-side case): track the position.
        _ => {
            positions.insert(
                pending.symbol.clone(),
                Position {
                    symbol: pending.symbol.clone(),
                    side: pending.side,
                    size: confirmation.executed_size,
                    entry_price: confirmation.executed_price,
                    unrealized_pnl: Decimal::ZERO,
                    opened_at: confirmation.submitted_at,
                },
            );
            Trade {
                trade_id: Uuid::new_v4(),
                strategy_id: pending.strategy_id.clone(),
                timestamp: confirmation.submitted_at,
                symbol: pending.symbol.clone(),
                side: pending.side,
                size: confirmation.executed_size,
                entry_price: confirmation.executed_price,
                exit_price: None,
                fees: confirmation.fees,
                slippage: Decimal::ZERO,
                pnl: Decimal::ZERO,
                pnl_pct: Decimal::ZERO,
            }
        }
    };

    runtime.trades.lock().await.push(trade.clone());
    trade
}

/// The Kelly sizing bound from the session's closed trades, when there is
/// enough history to mean anything.
fn kelly_bound(trades: &[Trade], cap_pct: Decimal) -> Option<Decimal> {
    const MIN_TRADES: usize = 5;
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.exit_price.is_some()).collect();
    if closed.len() < MIN_TRADES {
        return None;
    }

    let wins = closed.iter().filter(|t| t.pnl > Decimal::ZERO).count();
    let losses = closed.len() - wins;
    if wins == 0 || losses == 0 {
        return None;
    }

    let average_win = closed
        .iter()
        .filter(|t| t.pnl > Decimal::ZERO)
        .map(|t| t.pnl)
        .sum::<Decimal>()
        / Decimal::from(wins);
    let average_loss = closed
        .iter()
        .filter(|t| t.pnl <= Decimal::ZERO)
        .map(|t| t.pnl.abs())
        .sum::<Decimal>()
        / Decimal::from(losses);
    if average_loss <= Decimal::ZERO {
        return None;
    }

    let win_rate = Decimal::from(wins) / Decimal::from(closed.len());
    Some(risk::calculate_kelly_position_pct(
        win_rate,
        average_win / average_loss,
        cap_pct,
    ))
}
