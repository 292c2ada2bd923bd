use crate::enums::{Chain, DecisionAction, TradeSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One OHLCV sample for a fixed time bucket.
///
/// Candles are immutable once produced. A well-formed series is ordered by
/// timestamp with no duplicates; validating that is the data collaborator's
/// job, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// An open position held by a strategy. At most one per symbol per strategy;
/// there is no netting across symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: TradeSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
}

/// The output of a decision provider for a single tick. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    /// Confidence in [0, 1].
    pub confidence: Decimal,
    /// Desired position size as a percentage of equity, in [0, 100].
    /// The risk layer may only narrow this, never widen it.
    pub target_position_size_pct: Decimal,
    pub notes: String,
}

impl Decision {
    /// The canonical "forced safe" decision, used whenever a hard risk limit
    /// is breached: flat, zero confidence, zero size.
    pub fn forced_flat(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Flat,
            confidence: Decimal::ZERO,
            target_position_size_pct: Decimal::ZERO,
            notes: reason.into(),
        }
    }
}

/// A single entry in the append-only trade ledger.
///
/// Created when a position opens or closes; a closed trade carries a non-null
/// `exit_price` and a realized `pnl`. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub strategy_id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: TradeSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub fees: Decimal,
    pub slippage: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: Decimal,
}

/// An unsigned swap transaction produced by a quote route. The payload is an
/// opaque serialized transaction for the external signer; this core never
/// constructs or signs chain transactions itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedSwap {
    pub source_id: String,
    pub chain: Chain,
    pub payload: String,
}

/// One slice of a TWAP order: the unsigned swap plus its scheduled offset
/// from the start of the execution window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapChunk {
    pub swap: UnsignedSwap,
    pub amount: Decimal,
    pub delay_ms: u64,
}

/// The unsigned artifact handed to the external signer: either a single swap
/// or a full TWAP chunk schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnsignedOrder {
    Single(UnsignedSwap),
    Twap(Vec<TwapChunk>),
}

/// A hand-off artifact awaiting external signature.
///
/// The orchestrator holds at most one per strategy. It is cleared when a
/// completed trade is recorded against it or when the strategy stops; an
/// abandoned pending trade simply expires, with no implicit retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTrade {
    pub strategy_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub size: Decimal,
    pub price: Decimal,
    pub unsigned_order: UnsignedOrder,
    pub created_at: DateTime<Utc>,
}

/// A point-in-time performance reading, emitted at a caller-chosen cadence
/// so progress can be monitored without re-deriving history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe: Decimal,
    pub win_rate: Decimal,
    pub total_trades: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn forced_flat_is_the_canonical_safe_decision() {
        let d = Decision::forced_flat("daily loss limit breached");
        assert_eq!(d.action, DecisionAction::Flat);
        assert_eq!(d.confidence, Decimal::ZERO);
        assert_eq!(d.target_position_size_pct, Decimal::ZERO);
        assert_eq!(d.notes, "daily loss limit breached");
    }

    #[test]
    fn trade_serializes_with_optional_exit() {
        let trade = Trade {
            trade_id: Uuid::new_v4(),
            strategy_id: "momentum-btc".to_string(),
            timestamp: Utc::now(),
            symbol: "BTC/USDC".to_string(),
            side: TradeSide::Long,
            size: dec!(0.5),
            entry_price: dec!(100),
            exit_price: None,
            fees: Decimal::ZERO,
            slippage: Decimal::ZERO,
            pnl: Decimal::ZERO,
            pnl_pct: Decimal::ZERO,
        };
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains("\"exit_price\":null"));
    }
}
