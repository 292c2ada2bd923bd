use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Returns the opposite side of the trade
    pub fn opposite(&self) -> Self {
        match self {
            TradeSide::Long => TradeSide::Short,
            TradeSide::Short => TradeSide::Long,
        }
    }

    /// The sign applied to price moves when computing PnL: +1 for longs, -1 for shorts.
    pub fn sign(&self) -> i64 {
        match self {
            TradeSide::Long => 1,
            TradeSide::Short => -1,
        }
    }
}

/// The action a decision provider proposes for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Long,
    Short,
    Flat,
}

impl DecisionAction {
    /// The trade side this action maps to, if it opens a position at all.
    pub fn side(&self) -> Option<TradeSide> {
        match self {
            DecisionAction::Long => Some(TradeSide::Long),
            DecisionAction::Short => Some(TradeSide::Short),
            DecisionAction::Flat => None,
        }
    }
}

/// The chain a strategy executes on. Live Solana execution sits behind a
/// global safety toggle in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Evm,
    Solana,
}
