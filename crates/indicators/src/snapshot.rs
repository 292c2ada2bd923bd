use crate::error::IndicatorError;
use core_types::Candle;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage as Ema,
    MovingAverageConvergenceDivergence as Macd, RelativeStrengthIndex as Rsi,
};
use ta::Next as _;

/// Minimum trailing-window length before a snapshot can be computed.
pub const MIN_BARS: usize = 20;

const RSI_PERIOD: usize = 14;
const EMA_FAST_PERIOD: usize = 12;
const EMA_SLOW_PERIOD: usize = 26;
const MACD_SIGNAL_PERIOD: usize = 9;
const BB_PERIOD: usize = 20;
const BB_STD_DEV: f64 = 2.0;
const ATR_PERIOD: usize = 14;

/// Coarse direction of the higher-timeframe trend, read from the trailing
/// window rather than from a separate data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl TrendDirection {
    /// -1, 0 or +1; the form the regime hash folds in.
    pub fn sign(&self) -> i8 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Sideways => 0,
            TrendDirection::Down => -1,
        }
    }
}

/// A computed indicator snapshot for one symbol at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Decimal,
    pub ema_fast: Decimal,
    pub ema_slow: Decimal,
    pub macd: Decimal,
    pub macd_signal: Decimal,
    pub bollinger_upper: Decimal,
    pub bollinger_middle: Decimal,
    pub bollinger_lower: Decimal,
    pub atr: Decimal,
    /// Standard deviation of close-to-close returns across the window,
    /// as a fraction (0.02 = 2%).
    pub volatility: Decimal,
    pub trend: TrendDirection,
}

impl IndicatorSnapshot {
    /// Computes a snapshot from a trailing candle window.
    ///
    /// The window must hold at least [`MIN_BARS`] candles; the caller owns
    /// the warm-up period and simply skips ticks until the buffer fills.
    pub fn compute(candles: &[Candle]) -> Result<Self, IndicatorError> {
        if candles.len() < MIN_BARS {
            return Err(IndicatorError::InsufficientData {
                required: MIN_BARS,
                got: candles.len(),
            });
        }

        let mut rsi = Rsi::new(RSI_PERIOD).map_err(to_calc_error)?;
        let mut ema_fast = Ema::new(EMA_FAST_PERIOD).map_err(to_calc_error)?;
        let mut ema_slow = Ema::new(EMA_SLOW_PERIOD).map_err(to_calc_error)?;
        let mut macd = Macd::new(EMA_FAST_PERIOD, EMA_SLOW_PERIOD, MACD_SIGNAL_PERIOD)
            .map_err(to_calc_error)?;
        let mut bb = BollingerBands::new(BB_PERIOD, BB_STD_DEV).map_err(to_calc_error)?;
        let mut atr = AverageTrueRange::new(ATR_PERIOD).map_err(to_calc_error)?;

        // The `ta` crate uses `f64`. We convert from our high-precision
        // `Decimal` here, once, as a controlled precision trade-off.
        let mut last_rsi = 0.0;
        let mut last_ema_fast = 0.0;
        let mut last_ema_slow = 0.0;
        let mut last_macd = (0.0, 0.0);
        let mut last_bb = (0.0, 0.0, 0.0);
        let mut last_atr = 0.0;

        for candle in candles {
            let close = candle.close.to_f64().ok_or_else(|| {
                IndicatorError::Calculation("close price is not representable as f64".to_string())
            })?;

            last_rsi = rsi.next(close);
            last_ema_fast = ema_fast.next(close);
            last_ema_slow = ema_slow.next(close);
            let m = macd.next(close);
            last_macd = (m.macd, m.signal);
            let b = bb.next(close);
            last_bb = (b.upper, b.average, b.lower);
            last_atr = atr.next(close);
        }

        // A perfectly flat series produces a 0/0 RSI update; read it as the
        // neutral midpoint instead of failing the whole snapshot.
        if !last_rsi.is_finite() {
            last_rsi = 50.0;
        }

        Ok(Self {
            rsi: from_f64(last_rsi)?,
            ema_fast: from_f64(last_ema_fast)?,
            ema_slow: from_f64(last_ema_slow)?,
            macd: from_f64(last_macd.0)?,
            macd_signal: from_f64(last_macd.1)?,
            bollinger_upper: from_f64(last_bb.0)?,
            bollinger_middle: from_f64(last_bb.1)?,
            bollinger_lower: from_f64(last_bb.2)?,
            atr: from_f64(last_atr)?,
            volatility: from_f64(returns_std_dev(candles))?,
            trend: window_trend(candles),
        })
    }
}

fn to_calc_error(e: ta::errors::TaError) -> IndicatorError {
    IndicatorError::Calculation(format!("{e:?}"))
}

fn from_f64(value: f64) -> Result<Decimal, IndicatorError> {
    if !value.is_finite() {
        return Err(IndicatorError::Calculation(format!(
            "non-finite indicator value: {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| IndicatorError::Calculation(format!("unrepresentable value: {value}")))
}

/// Standard deviation of close-to-close returns across the window.
fn returns_std_dev(candles: &[Candle]) -> f64 {
    let closes: Vec<f64> = candles
        .iter()
        .filter_map(|c| c.close.to_f64())
        .collect();

    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / returns.len() as f64;
    variance.sqrt()
}

/// Higher-timeframe trend, read as the newer half of the window against the
/// older half. A 0.2% band around parity reads as sideways.
fn window_trend(candles: &[Candle]) -> TrendDirection {
    let mid = candles.len() / 2;
    let older = mean_close(&candles[..mid]);
    let newer = mean_close(&candles[mid..]);
    if older == 0.0 {
        return TrendDirection::Sideways;
    }

    let drift = (newer - older) / older;
    if drift > 0.002 {
        TrendDirection::Up
    } else if drift < -0.002 {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    }
}

fn mean_close(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let sum: f64 = candles.iter().filter_map(|c| c.close.to_f64()).sum();
    sum / candles.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let c = Decimal::from_f64(close).unwrap();
                Candle {
                    timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: dec!(1000),
                }
            })
            .collect()
    }

    #[test]
    fn rejects_windows_below_the_minimum() {
        let candles = candles_from_closes(&[100.0; 5]);
        match IndicatorSnapshot::compute(&candles) {
            Err(IndicatorError::InsufficientData { required, got }) => {
                assert_eq!(required, MIN_BARS);
                assert_eq!(got, 5);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn flat_series_has_zero_volatility_and_sideways_trend() {
        let candles = candles_from_closes(&[100.0; 40]);
        let snapshot = IndicatorSnapshot::compute(&candles).unwrap();
        assert_eq!(snapshot.volatility, Decimal::ZERO);
        assert_eq!(snapshot.trend, TrendDirection::Sideways);
        assert_eq!(snapshot.ema_fast, snapshot.ema_slow);
    }

    #[test]
    fn monotonic_rise_reads_as_an_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let snapshot = IndicatorSnapshot::compute(&candles_from_closes(&closes)).unwrap();
        assert_eq!(snapshot.trend, TrendDirection::Up);
        assert!(snapshot.rsi > dec!(50));
    }

    #[test]
    fn monotonic_fall_reads_as_a_downtrend() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let snapshot = IndicatorSnapshot::compute(&candles_from_closes(&closes)).unwrap();
        assert_eq!(snapshot.trend, TrendDirection::Down);
        assert!(snapshot.rsi < dec!(50));
    }
}
