use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::{PerformanceSnapshot, Trade};
use rust_decimal::{Decimal, MathematicalOps};

/// A stateless calculator for deriving performance metrics from trading
/// activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// Only closed trades (those with an exit price) enter the statistics;
    /// an open position contributes to the equity curve but not to win
    /// rate or Sharpe.
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        let mut report = PerformanceReport::new();

        self.calculate_drawdown(equity_curve, &mut report);

        let closed: Vec<&Trade> = trades.iter().filter(|t| t.exit_price.is_some()).collect();
        if closed.is_empty() {
            // No closed trades: metrics stay zeroed, never NaN.
            return Ok(report);
        }

        self.calculate_profitability(&closed, initial_capital, &mut report);
        self.calculate_sharpe(&closed, &mut report)?;

        Ok(report)
    }

    /// Builds a point-in-time snapshot from the running state of a session.
    pub fn snapshot(
        &self,
        timestamp: DateTime<Utc>,
        equity: Decimal,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceSnapshot, AnalyticsError> {
        let report = self.calculate(trades, equity_curve, initial_capital)?;
        Ok(PerformanceSnapshot {
            timestamp,
            equity,
            max_drawdown_pct: report.max_drawdown_pct,
            sharpe: report.sharpe,
            win_rate: report.win_rate,
            total_trades: report.total_trades,
        })
    }

    /// Calculates all profitability-related metrics over closed trades.
    fn calculate_profitability(
        &self,
        closed: &[&Trade],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        report.total_trades = closed.len();

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;

        for trade in closed {
            report.total_return += trade.pnl;
            if trade.pnl > Decimal::ZERO {
                gross_profit += trade.pnl;
                report.winning_trades += 1;
            } else {
                gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
            }
        }

        report.win_rate =
            Decimal::from(report.winning_trades) / Decimal::from(report.total_trades);

        if report.winning_trades > 0 {
            report.average_win = gross_profit / Decimal::from(report.winning_trades);
        }
        if report.losing_trades > 0 {
            report.average_loss = gross_loss / Decimal::from(report.losing_trades);
        }
        if report.average_loss > Decimal::ZERO {
            report.payoff_ratio = report.average_win / report.average_loss;
        }

        if initial_capital > Decimal::ZERO {
            report.total_return_pct = report.total_return / initial_capital * Decimal::from(100);
        }
    }

    /// Calculates maximum drawdown from the equity curve.
    fn calculate_drawdown(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) {
        if equity_curve.is_empty() {
            return;
        }

        let mut peak_equity = equity_curve[0].1;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for &(_timestamp, equity) in equity_curve {
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = peak_equity - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                if peak_equity > Decimal::ZERO {
                    max_drawdown_pct = drawdown / peak_equity * Decimal::from(100);
                }
            }
        }

        report.max_drawdown = max_drawdown;
        report.max_drawdown_pct = max_drawdown_pct;
    }

    /// Calculates the Sharpe ratio over the per-trade return series.
    ///
    /// Annualized by √365 on the assumption that one trade ≈ one day. This
    /// is an approximation inherited from the original system and kept
    /// as-is: changing the constant would change every historical
    /// comparison.
    fn calculate_sharpe(
        &self,
        closed: &[&Trade],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        let returns: Vec<Decimal> = closed
            .iter()
            .map(|t| t.pnl_pct / Decimal::from(100))
            .collect();
        if returns.len() < 2 {
            return Ok(());
        }

        let count = Decimal::from(returns.len());
        let mean: Decimal = returns.iter().sum::<Decimal>() / count;
        let variance: Decimal = returns
            .iter()
            .map(|r| (*r - mean) * (*r - mean))
            .sum::<Decimal>()
            / count;

        if variance <= Decimal::ZERO {
            // Zero dispersion: by convention the ratio is 0, not infinite.
            return Ok(());
        }

        let std_dev = variance.sqrt().ok_or_else(|| {
            AnalyticsError::InternalError("failed to take square root of variance".to_string())
        })?;
        let annualization = Decimal::from(365).sqrt().ok_or_else(|| {
            AnalyticsError::InternalError("failed to compute annualization factor".to_string())
        })?;

        report.sharpe = mean / std_dev * annualization;
        Ok(())
    }
}
