use configuration::RiskLimits;
use core_types::{Position, TradeSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// A trade the strategy would like to make, before admission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub size: Decimal,
    pub price: Decimal,
}

/// True iff the day's realized loss has reached the configured limit.
///
/// A non-negative `daily_pnl` never trips the gate, whatever the limit.
pub fn is_daily_loss_limit_exceeded(
    daily_pnl: Decimal,
    equity: Decimal,
    max_daily_loss_pct: Decimal,
) -> bool {
    if daily_pnl >= Decimal::ZERO || equity <= Decimal::ZERO {
        return false;
    }
    daily_pnl.abs() / equity >= max_daily_loss_pct / dec!(100)
}

/// Classic Kelly fraction `f = w − (1−w)/r`, expressed as a percentage and
/// clamped to `[0, cap_pct]`.
///
/// A non-positive payoff ratio means there is no edge to leverage; the
/// answer is 0, never an error.
pub fn calculate_kelly_position_pct(
    win_rate: Decimal,
    payoff_ratio: Decimal,
    cap_pct: Decimal,
) -> Decimal {
    if payoff_ratio <= Decimal::ZERO || cap_pct <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let kelly = win_rate - (Decimal::ONE - win_rate) / payoff_ratio;
    (kelly * dec!(100)).clamp(Decimal::ZERO, cap_pct)
}

/// Converts a target percentage of equity into a position size in base
/// units: `min(target, cap)/100 × equity / price`, floored at 0.
pub fn calculate_position_size(
    target_pct: Decimal,
    equity: Decimal,
    price: Decimal,
    cap_pct: Decimal,
) -> Decimal {
    if price <= Decimal::ZERO || equity <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let effective_pct = target_pct.min(cap_pct).max(Decimal::ZERO);
    effective_pct / dec!(100) * equity / price
}

/// Like [`calculate_position_size`], additionally bounded by `max_leverage`
/// when the limits carry one. The limits are only ever narrowed here, never
/// widened.
pub fn clamp_position_size(
    target_pct: Decimal,
    equity: Decimal,
    price: Decimal,
    limits: &RiskLimits,
) -> Decimal {
    let size = calculate_position_size(target_pct, equity, price, limits.max_position_pct);
    if size.is_zero() {
        return size;
    }

    match limits.max_leverage {
        Some(max_leverage) if max_leverage > Decimal::ZERO => {
            let max_notional = equity * max_leverage;
            size.min(max_notional / price)
        }
        _ => size,
    }
}

/// The single admission gate all order construction passes through.
///
/// Rejects when the daily-loss limit is already exceeded, when the proposed
/// notional exceeds `max_position_pct` of equity, or when running drawdown
/// has breached the configured hard ceiling. Pure predicate; no side effects.
pub fn should_take_trade(
    equity: Decimal,
    daily_pnl: Decimal,
    proposed: &ProposedTrade,
    current_positions: &HashMap<String, Position>,
    limits: &RiskLimits,
    _recent_returns: &[Decimal],
    max_drawdown_pct: Decimal,
) -> bool {
    if equity <= Decimal::ZERO || proposed.size <= Decimal::ZERO || proposed.price <= Decimal::ZERO
    {
        return false;
    }

    // The daily-loss gate dominates every other argument.
    if is_daily_loss_limit_exceeded(daily_pnl, equity, limits.max_daily_loss_pct) {
        return false;
    }

    if let Some(ceiling) = limits.max_drawdown_pct {
        if max_drawdown_pct >= ceiling {
            return false;
        }
    }

    // One open position per symbol per strategy; adds are sized upstream.
    if let Some(existing) = current_positions.get(&proposed.symbol) {
        if existing.side == proposed.side {
            return false;
        }
    }

    let notional = proposed.size * proposed.price;
    notional <= equity * limits.max_position_pct / dec!(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position_pct: dec!(25),
            max_daily_loss_pct: dec!(5),
            stop_loss_pct: None,
            take_profit_pct: None,
            trailing_stop_pct: None,
            max_leverage: None,
            kelly_fraction_cap_pct: Some(dec!(20)),
            max_drawdown_pct: Some(dec!(30)),
        }
    }

    fn proposed(size: Decimal, price: Decimal) -> ProposedTrade {
        ProposedTrade {
            symbol: "BTC/USDC".to_string(),
            side: TradeSide::Long,
            size,
            price,
        }
    }

    #[test]
    fn kelly_is_zero_for_any_non_positive_payoff_ratio() {
        for payoff in [dec!(0), dec!(-1), dec!(-1000)] {
            for win_rate in [dec!(0), dec!(0.5), dec!(1)] {
                assert_eq!(
                    calculate_kelly_position_pct(win_rate, payoff, dec!(25)),
                    Decimal::ZERO
                );
            }
        }
    }

    #[test]
    fn kelly_clamps_to_the_cap() {
        // w=0.9, r=3 -> f = 0.9 - 0.1/3 ≈ 0.8667 -> 86.67%, capped at 20.
        let pct = calculate_kelly_position_pct(dec!(0.9), dec!(3), dec!(20));
        assert_eq!(pct, dec!(20));
    }

    #[test]
    fn kelly_negative_edge_floors_at_zero() {
        // w=0.3, r=1 -> f = 0.3 - 0.7 = -0.4 -> floored at 0.
        let pct = calculate_kelly_position_pct(dec!(0.3), dec!(1), dec!(20));
        assert_eq!(pct, Decimal::ZERO);
    }

    #[test]
    fn daily_loss_limit_trips_on_the_documented_scenario() {
        // Daily PnL of -6 on equity 100 with a 5% limit.
        assert!(is_daily_loss_limit_exceeded(dec!(-6), dec!(100), dec!(5)));
        // Exactly at the limit counts as exceeded.
        assert!(is_daily_loss_limit_exceeded(dec!(-5), dec!(100), dec!(5)));
        // Below the limit, or profitable, does not.
        assert!(!is_daily_loss_limit_exceeded(dec!(-4.9), dec!(100), dec!(5)));
        assert!(!is_daily_loss_limit_exceeded(dec!(6), dec!(100), dec!(5)));
    }

    #[test]
    fn position_size_respects_the_cap_and_floors_at_zero() {
        // 50% requested, 25% cap, equity 1000 @ price 10 -> 25 units.
        assert_eq!(
            calculate_position_size(dec!(50), dec!(1000), dec!(10), dec!(25)),
            dec!(25)
        );
        // Degenerate inputs size to zero instead of erroring.
        assert_eq!(
            calculate_position_size(dec!(50), dec!(1000), Decimal::ZERO, dec!(25)),
            Decimal::ZERO
        );
        assert_eq!(
            calculate_position_size(dec!(-10), dec!(1000), dec!(10), dec!(25)),
            Decimal::ZERO
        );
    }

    #[test]
    fn leverage_bound_narrows_the_size() {
        let mut l = limits();
        l.max_position_pct = dec!(100);
        l.max_leverage = Some(dec!(0.5));
        // Unlevered size would be 100 units; 0.5x leverage allows only 50.
        assert_eq!(
            clamp_position_size(dec!(100), dec!(1000), dec!(10), &l),
            dec!(50)
        );
    }

    #[test]
    fn admission_fails_whenever_the_daily_loss_gate_is_tripped() {
        // The daily-loss gate must dominate regardless of other arguments.
        let tiny_trade = proposed(dec!(0.0001), dec!(1));
        assert!(!should_take_trade(
            dec!(100),
            dec!(-6),
            &tiny_trade,
            &HashMap::new(),
            &limits(),
            &[],
            Decimal::ZERO,
        ));
    }

    #[test]
    fn admission_rejects_oversized_notional() {
        // 30 units @ 10 = 300 notional vs 25% of 1000 equity = 250.
        assert!(!should_take_trade(
            dec!(1000),
            Decimal::ZERO,
            &proposed(dec!(30), dec!(10)),
            &HashMap::new(),
            &limits(),
            &[],
            Decimal::ZERO,
        ));
        // 20 units @ 10 = 200 notional fits.
        assert!(should_take_trade(
            dec!(1000),
            Decimal::ZERO,
            &proposed(dec!(20), dec!(10)),
            &HashMap::new(),
            &limits(),
            &[],
            Decimal::ZERO,
        ));
    }

    #[test]
    fn admission_rejects_past_the_drawdown_ceiling() {
        assert!(!should_take_trade(
            dec!(1000),
            Decimal::ZERO,
            &proposed(dec!(1), dec!(10)),
            &HashMap::new(),
            &limits(),
            &[],
            dec!(35),
        ));
    }

    #[test]
    fn admission_rejects_stacking_onto_an_existing_same_side_position() {
        let mut positions = HashMap::new();
        positions.insert(
            "BTC/USDC".to_string(),
            Position {
                symbol: "BTC/USDC".to_string(),
                side: TradeSide::Long,
                size: dec!(1),
                entry_price: dec!(10),
                unrealized_pnl: Decimal::ZERO,
                opened_at: Utc::now(),
            },
        );
        assert!(!should_take_trade(
            dec!(1000),
            Decimal::ZERO,
            &proposed(dec!(1), dec!(10)),
            &positions,
            &limits(),
            &[],
            Decimal::ZERO,
        ));
    }
}
