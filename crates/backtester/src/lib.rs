//! # Meridian Backtester
//!
//! Replays a historical candle series bar-by-bar through a decision function
//! and the risk rules, producing a full trade ledger, an equity curve and a
//! performance report. Results also stream through the optional persistence
//! sink so callers can store them without the backtester knowing about
//! storage.
//!
//! The series is assumed clean (sorted, no duplicate timestamps); validating
//! upstream data is the data collaborator's responsibility, not re-checked
//! here.

use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::StrategyConfig;
use core_types::{Candle, Decision, DecisionAction, Position, Trade, TradeSide};
use events::PersistenceSink;
use indicatif::{ProgressBar, ProgressStyle};
use indicators::{IndicatorSnapshot, MIN_BARS};
use risk::{DailyLossTracker, ProposedTrade};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use strategies::{rule_based, DecisionProvider, MarketContext};
use uuid::Uuid;

pub mod error;

pub use error::BacktestError;

/// Longest trailing window handed to the indicator calculations.
const INDICATOR_WINDOW: usize = 50;

/// Minimum closed-trade history before the Kelly bound participates in
/// sizing. Below this the running win rate is noise.
const KELLY_MIN_TRADES: usize = 5;

/// Inputs for one backtest run.
pub struct BacktestParams {
    pub strategy: StrategyConfig,
    /// Single-symbol replay is the atomic unit; multi-symbol strategies
    /// compose runs.
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub initial_equity: Decimal,
    /// Skip the decision provider entirely and use the deterministic
    /// rule-based path. The required fast path for long histories.
    pub fast_mode: bool,
    /// Emit a performance snapshot every N closed trades; 0 disables.
    pub snapshot_every_trades: usize,
}

/// The complete output of a run.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_equity: Decimal,
    pub final_equity: Decimal,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    pub report: PerformanceReport,
}

/// Bookkeeping for the currently open position.
struct OpenTrade {
    position: Position,
    stop_price: Option<Decimal>,
    take_profit_price: Option<Decimal>,
    /// Most favorable price seen since entry; drives the trailing stop.
    best_price: Decimal,
}

/// Mutable session state threaded through the replay loop.
struct SessionState {
    equity: Decimal,
    peak_equity: Decimal,
    running_drawdown_pct: Decimal,
    open: Option<OpenTrade>,
    trades: Vec<Trade>,
    recent_returns: Vec<Decimal>,
    equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    daily: DailyLossTracker,
}

/// The main backtesting engine.
pub struct Backtester {
    decider: Option<Arc<dyn DecisionProvider>>,
    sink: Option<Arc<dyn PersistenceSink>>,
    analytics: AnalyticsEngine,
}

impl Backtester {
    /// Constructs a backtester. Both collaborators are optional: without a
    /// decider every run uses the rule-based path, and without a sink the
    /// results are still computed and returned.
    pub fn new(
        decider: Option<Arc<dyn DecisionProvider>>,
        sink: Option<Arc<dyn PersistenceSink>>,
    ) -> Self {
        Self {
            decider,
            sink,
            analytics: AnalyticsEngine::new(),
        }
    }

    /// Runs the simulation.
    pub async fn run(&self, params: BacktestParams) -> Result<BacktestResult, BacktestError> {
        if params.candles.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }

        let mut state = SessionState {
            equity: params.initial_equity,
            peak_equity: params.initial_equity,
            running_drawdown_pct: Decimal::ZERO,
            open: None,
            trades: Vec::new(),
            recent_returns: Vec::new(),
            equity_curve: Vec::with_capacity(params.candles.len()),
            daily: DailyLossTracker::new(),
        };

        let progress_bar = ProgressBar::new(params.candles.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );

        for (i, candle) in params.candles.iter().enumerate() {
            state.daily.observe(candle.timestamp);

            // --- 1. Intrabar exit checks, before any new decision ---
            let protective = state
                .open
                .as_ref()
                .and_then(|open| protective_exit(open, candle));
            if let Some((exit_price, reason)) = protective {
                tracing::debug!(price = %exit_price, reason, "protective exit");
                self.settle_close(&mut state, exit_price, candle.timestamp, &params)?;
                self.finish_bar(&mut state, candle, &progress_bar);
                continue;
            }
            if let Some(open) = state.open.as_mut() {
                trail_stop(open, candle, params.strategy.risk.trailing_stop_pct);
            }

            // --- 2. Indicators over the trailing window ---
            let start = (i + 1).saturating_sub(INDICATOR_WINDOW);
            let window = &params.candles[start..=i];
            if window.len() < MIN_BARS {
                self.finish_bar(&mut state, candle, &progress_bar);
                continue;
            }
            let snapshot = IndicatorSnapshot::compute(window)?;

            // --- 3. Decision: fast path, injected provider, or fallback ---
            let decision = self
                .resolve_decision(&params, candle, &snapshot, window, &state.open)
                .await;

            // --- 4. Apply the decision ---
            let open_side = state.open.as_ref().map(|o| o.position.side);
            match open_side {
                Some(side) => {
                    let wants_exit = decision.action == DecisionAction::Flat
                        || decision.action.side() == Some(side.opposite());
                    if wants_exit {
                        self.settle_close(&mut state, candle.close, candle.timestamp, &params)?;
                    }
                }
                None => {
                    if let Some(side) = decision.action.side() {
                        let opened = self.try_open(side, &decision, candle, &params, &state);
                        state.open = opened;
                    }
                }
            }

            // --- 5. Record mark-to-market equity ---
            self.finish_bar(&mut state, candle, &progress_bar);
        }

        progress_bar.finish_with_message("Simulation complete.");

        let report = self
            .analytics
            .calculate(&state.trades, &state.equity_curve, params.initial_equity)?;

        Ok(BacktestResult {
            initial_equity: params.initial_equity,
            final_equity: state
                .equity_curve
                .last()
                .map(|(_, e)| *e)
                .unwrap_or(params.initial_equity),
            trades: state.trades,
            equity_curve: state.equity_curve,
            report,
        })
    }

    /// Closes the open position (if any), settles PnL into the session and
    /// reports the trade through the sink.
    fn settle_close(
        &self,
        state: &mut SessionState,
        exit_price: Decimal,
        timestamp: DateTime<Utc>,
        params: &BacktestParams,
    ) -> Result<(), BacktestError> {
        let Some(open) = state.open.take() else {
            return Ok(());
        };

        let trade = close_position(open, exit_price, timestamp, params, state.trades.len());
        state.equity += trade.pnl;
        state.daily.record(trade.pnl);
        state.recent_returns.push(trade.pnl_pct / dec!(100));

        if let Some(sink) = &self.sink {
            sink.on_trade(&trade);
        }
        state.trades.push(trade);

        let every = params.snapshot_every_trades;
        if every > 0 && state.trades.len() % every == 0 {
            if let Some(sink) = &self.sink {
                let snapshot = self.analytics.snapshot(
                    timestamp,
                    state.equity,
                    &state.trades,
                    &state.equity_curve,
                    params.initial_equity,
                )?;
                sink.on_snapshot(&snapshot);
            }
        }
        Ok(())
    }

    /// Records mark-to-market equity for this bar and advances the
    /// drawdown/progress accounting.
    fn finish_bar(&self, state: &mut SessionState, candle: &Candle, progress_bar: &ProgressBar) {
        let marked = mark_to_market(state.equity, &state.open, candle.close);
        if let Some(open) = state.open.as_mut() {
            let p = &mut open.position;
            p.unrealized_pnl =
                (candle.close - p.entry_price) * p.size * Decimal::from(p.side.sign());
        }
        state.equity_curve.push((candle.timestamp, marked));

        if marked > state.peak_equity {
            state.peak_equity = marked;
        }
        if state.peak_equity > Decimal::ZERO {
            let dd = (state.peak_equity - marked) / state.peak_equity * dec!(100);
            if dd > state.running_drawdown_pct {
                state.running_drawdown_pct = dd;
            }
        }
        progress_bar.inc(1);
    }

    async fn resolve_decision(
        &self,
        params: &BacktestParams,
        candle: &Candle,
        snapshot: &IndicatorSnapshot,
        window: &[Candle],
        open: &Option<OpenTrade>,
    ) -> Decision {
        let Some(decider) = self.decider.as_ref().filter(|_| !params.fast_mode) else {
            return rule_based::decide(snapshot, &params.strategy.rule);
        };

        let context = MarketContext {
            symbol: params.symbol.clone(),
            price: candle.close,
            indicators: snapshot.clone(),
            candles: window.to_vec(),
            open_position: open.as_ref().map(|o| o.position.clone()),
        };
        match decider.decide(&context, &params.strategy).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "decision provider failed, using rule-based fallback");
                rule_based::decide(snapshot, &params.strategy.rule)
            }
        }
    }

    /// Sizing and admission for a prospective entry. Returns the opened
    /// position bookkeeping when the trade is admitted.
    fn try_open(
        &self,
        side: TradeSide,
        decision: &Decision,
        candle: &Candle,
        params: &BacktestParams,
        state: &SessionState,
    ) -> Option<OpenTrade> {
        let limits = &params.strategy.risk;

        let mut target_pct = decision.target_position_size_pct;
        if let Some(cap) = limits.kelly_fraction_cap_pct {
            if let Some(kelly_pct) = kelly_bound(&state.trades, cap) {
                target_pct = target_pct.min(kelly_pct);
            }
        }

        let size = risk::clamp_position_size(target_pct, state.equity, candle.close, limits);
        if size <= Decimal::ZERO {
            return None;
        }

        let proposed = ProposedTrade {
            symbol: params.symbol.clone(),
            side,
            size,
            price: candle.close,
        };
        let admitted = risk::should_take_trade(
            state.equity,
            state.daily.daily_pnl(),
            &proposed,
            &HashMap::new(),
            limits,
            &state.recent_returns,
            state.running_drawdown_pct,
        );
        if !admitted {
            tracing::debug!(symbol = %params.symbol, %size, "entry rejected by risk admission");
            return None;
        }

        let entry = candle.close;
        let stop_price = limits.stop_loss_pct.map(|pct| match side {
            TradeSide::Long => entry * (Decimal::ONE - pct / dec!(100)),
            TradeSide::Short => entry * (Decimal::ONE + pct / dec!(100)),
        });
        let take_profit_price = limits.take_profit_pct.map(|pct| match side {
            TradeSide::Long => entry * (Decimal::ONE + pct / dec!(100)),
            TradeSide::Short => entry * (Decimal::ONE - pct / dec!(100)),
        });

        Some(OpenTrade {
            position: Position {
                symbol: params.symbol.clone(),
                side,
                size,
                entry_price: entry,
                unrealized_pnl: Decimal::ZERO,
                opened_at: candle.timestamp,
            },
            stop_price,
            take_profit_price,
            best_price: entry,
        })
    }
}

/// Checks the protective exits against this bar's range, using the stop
/// levels as they stood at the end of the previous bar. Stop-loss wins when
/// both protective levels fall inside one bar.
fn protective_exit(open: &OpenTrade, candle: &Candle) -> Option<(Decimal, &'static str)> {
    let side = open.position.side;
    if let Some(stop) = open.stop_price {
        let hit = match side {
            TradeSide::Long => candle.low <= stop,
            TradeSide::Short => candle.high >= stop,
        };
        if hit {
            return Some((stop, "stop-loss"));
        }
    }
    if let Some(tp) = open.take_profit_price {
        let hit = match side {
            TradeSide::Long => candle.high >= tp,
            TradeSide::Short => candle.low <= tp,
        };
        if hit {
            return Some((tp, "take-profit"));
        }
    }
    None
}

/// Ratchets the trailing stop after this bar's extremes are known.
fn trail_stop(open: &mut OpenTrade, candle: &Candle, trailing_stop_pct: Option<Decimal>) {
    let Some(pct) = trailing_stop_pct else {
        return;
    };
    match open.position.side {
        TradeSide::Long => {
            if candle.high > open.best_price {
                open.best_price = candle.high;
            }
            let trail = open.best_price * (Decimal::ONE - pct / dec!(100));
            open.stop_price = Some(open.stop_price.map_or(trail, |s| s.max(trail)));
        }
        TradeSide::Short => {
            if candle.low < open.best_price {
                open.best_price = candle.low;
            }
            let trail = open.best_price * (Decimal::ONE + pct / dec!(100));
            open.stop_price = Some(open.stop_price.map_or(trail, |s| s.min(trail)));
        }
    }
}

/// Settles an open position into a ledger entry. Fees and slippage are
/// rate-based on the round-trip notional and net against the price PnL.
fn close_position(
    open: OpenTrade,
    exit_price: Decimal,
    timestamp: DateTime<Utc>,
    params: &BacktestParams,
    sequence: usize,
) -> Trade {
    let position = open.position;
    let costs = &params.strategy.costs;
    let round_trip_notional = (position.entry_price + exit_price) * position.size;
    let fees = round_trip_notional * costs.fee_pct;
    let slippage = round_trip_notional * costs.slippage_pct;

    let direction = Decimal::from(position.side.sign());
    let pnl = (exit_price - position.entry_price) * position.size * direction - fees - slippage;

    let entry_notional = position.entry_price * position.size;
    let pnl_pct = if entry_notional > Decimal::ZERO {
        pnl / entry_notional * dec!(100)
    } else {
        Decimal::ZERO
    };

    Trade {
        // Deterministic ids keep identical runs byte-identical.
        trade_id: Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{}:{}:{}", params.strategy.id, params.symbol, sequence).as_bytes(),
        ),
        strategy_id: params.strategy.id.clone(),
        timestamp,
        symbol: position.symbol,
        side: position.side,
        size: position.size,
        entry_price: position.entry_price,
        exit_price: Some(exit_price),
        fees,
        slippage,
        pnl,
        pnl_pct,
    }
}

fn mark_to_market(equity: Decimal, open: &Option<OpenTrade>, price: Decimal) -> Decimal {
    match open {
        Some(open_trade) => {
            let p = &open_trade.position;
            equity + (price - p.entry_price) * p.size * Decimal::from(p.side.sign())
        }
        None => equity,
    }
}

/// The Kelly sizing bound from the running closed-trade statistics, when
/// there is enough history to mean anything. All-win histories have no
/// finite payoff ratio and impose no bound.
fn kelly_bound(trades: &[Trade], cap_pct: Decimal) -> Option<Decimal> {
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.exit_price.is_some()).collect();
    if closed.len() < KELLY_MIN_TRADES {
        return None;
    }

    let wins: Vec<&&Trade> = closed.iter().filter(|t| t.pnl > Decimal::ZERO).collect();
    let losses: Vec<&&Trade> = closed.iter().filter(|t| t.pnl <= Decimal::ZERO).collect();
    if wins.is_empty() || losses.is_empty() {
        return None;
    }

    let win_rate = Decimal::from(wins.len()) / Decimal::from(closed.len());
    let average_win = wins.iter().map(|t| t.pnl).sum::<Decimal>() / Decimal::from(wins.len());
    let average_loss =
        losses.iter().map(|t| t.pnl.abs()).sum::<Decimal>() / Decimal::from(losses.len());
    if average_loss <= Decimal::ZERO {
        return None;
    }

    Some(risk::calculate_kelly_position_pct(
        win_rate,
        average_win / average_loss,
        cap_pct,
    ))
}
