//! # Meridian Risk
//!
//! The risk-admission layer: position sizing, Kelly capping, daily-loss and
//! drawdown gates. Every function here is pure and total: no I/O, no hidden
//! clocks, no panics. A malformed input produces a safe default (zero size,
//! `false` admission) rather than an error, so a single bad value can never
//! halt a strategy loop. Errors are reserved for construction-time parameter
//! validation.

pub mod daily;
pub mod error;
pub mod manager;

pub use daily::DailyLossTracker;
pub use error::RiskError;
pub use manager::{
    calculate_kelly_position_pct, calculate_position_size, clamp_position_size,
    is_daily_loss_limit_exceeded, should_take_trade, ProposedTrade,
};
