use crate::error::StrategyError;
use crate::{DecisionProvider, MarketContext};
use async_trait::async_trait;
use configuration::{RuleParams, StrategyConfig};
use core_types::{Decision, DecisionAction};
use indicators::{IndicatorSnapshot, TrendDirection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The deterministic rule-based decision function.
///
/// Mean-reversion with a trend veto: oversold RSI in a market that is not
/// falling goes long, overbought RSI in a market that is not rising goes
/// short, anything else stays flat. Confidence scales with how far past the
/// threshold RSI has moved. Pure and total, so backtests over long histories
/// can run one call per bar with no provider round-trip, and a live tick
/// always has a safe fallback.
pub fn decide(snapshot: &IndicatorSnapshot, params: &RuleParams) -> Decision {
    let (action, distance) = if snapshot.rsi <= params.rsi_oversold
        && snapshot.trend != TrendDirection::Down
    {
        (DecisionAction::Long, params.rsi_oversold - snapshot.rsi)
    } else if snapshot.rsi >= params.rsi_overbought && snapshot.trend != TrendDirection::Up {
        (DecisionAction::Short, snapshot.rsi - params.rsi_overbought)
    } else {
        return Decision {
            action: DecisionAction::Flat,
            confidence: Decimal::ZERO,
            target_position_size_pct: Decimal::ZERO,
            notes: "rule: no signal".to_string(),
        };
    };

    // 0.5 at the threshold, 1.0 once RSI is 20 points past it.
    let confidence = (dec!(0.5) + distance / dec!(40)).min(Decimal::ONE);

    Decision {
        action,
        confidence,
        target_position_size_pct: params.entry_size_pct,
        notes: format!("rule: rsi={} trend={:?}", snapshot.rsi.round_dp(2), snapshot.trend),
    }
}

/// [`decide`] behind the `DecisionProvider` trait, for callers that inject
/// providers rather than branching on a fast-mode flag.
#[derive(Debug, Default)]
pub struct RuleBasedProvider;

#[async_trait]
impl DecisionProvider for RuleBasedProvider {
    async fn decide(
        &self,
        context: &MarketContext,
        config: &StrategyConfig,
    ) -> Result<Decision, StrategyError> {
        Ok(decide(&context.indicators, &config.rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rsi: Decimal, trend: TrendDirection) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi,
            ema_fast: dec!(100),
            ema_slow: dec!(100),
            macd: Decimal::ZERO,
            macd_signal: Decimal::ZERO,
            bollinger_upper: dec!(105),
            bollinger_middle: dec!(100),
            bollinger_lower: dec!(95),
            atr: dec!(1),
            volatility: dec!(0.01),
            trend,
        }
    }

    #[test]
    fn oversold_in_a_non_down_market_goes_long() {
        let d = decide(&snapshot(dec!(25), TrendDirection::Up), &RuleParams::default());
        assert_eq!(d.action, DecisionAction::Long);
        assert!(d.confidence > dec!(0.5));
        assert_eq!(d.target_position_size_pct, dec!(10));
    }

    #[test]
    fn oversold_in_a_downtrend_is_vetoed() {
        let d = decide(&snapshot(dec!(25), TrendDirection::Down), &RuleParams::default());
        assert_eq!(d.action, DecisionAction::Flat);
        assert_eq!(d.confidence, Decimal::ZERO);
    }

    #[test]
    fn overbought_in_a_non_up_market_goes_short() {
        let d = decide(
            &snapshot(dec!(80), TrendDirection::Sideways),
            &RuleParams::default(),
        );
        assert_eq!(d.action, DecisionAction::Short);
    }

    #[test]
    fn mid_range_rsi_stays_flat() {
        let d = decide(&snapshot(dec!(50), TrendDirection::Up), &RuleParams::default());
        assert_eq!(d.action, DecisionAction::Flat);
        assert_eq!(d.target_position_size_pct, Decimal::ZERO);
    }

    #[test]
    fn confidence_saturates_at_one() {
        let d = decide(&snapshot(Decimal::ZERO, TrendDirection::Up), &RuleParams::default());
        assert_eq!(d.confidence, Decimal::ONE);
    }

    #[test]
    fn never_enter_params_always_stay_flat() {
        let params = RuleParams {
            rsi_oversold: Decimal::ZERO,
            rsi_overbought: dec!(100),
            entry_size_pct: dec!(10),
        };
        for rsi in [dec!(1), dec!(50), dec!(99)] {
            let d = decide(&snapshot(rsi, TrendDirection::Up), &params);
            assert_eq!(d.action, DecisionAction::Flat);
        }
    }
}
