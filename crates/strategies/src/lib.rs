//! # Meridian Strategy Library
//!
//! This crate defines how decisions are obtained. It provides the universal
//! `DecisionProvider` trait plus the deterministic rule-based provider that
//! serves as the backtester's fast path and the live engine's degradation
//! fallback.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   execution, persistence or the network. It depends only on `core-types`,
//!   `indicators` and `configuration`.
//! - **Provider Agnostic Engine:** By using the `DecisionProvider` trait,
//!   higher-level crates like the `backtester` and `engine` can operate on
//!   any provider (an LLM-backed brain or the local rule function) without
//!   knowing its internals.
//! - **Deterministic Fallback:** The rule-based path is pure and total, so a
//!   provider timeout always has somewhere safe to land.

pub mod error;
pub mod rule_based;

pub use error::StrategyError;
pub use rule_based::RuleBasedProvider;

use async_trait::async_trait;
use configuration::StrategyConfig;
use core_types::{Candle, Decision, Position};
use indicators::IndicatorSnapshot;
use rust_decimal::Decimal;

/// Everything a provider may consider when deciding on one tick.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub symbol: String,
    pub price: Decimal,
    pub indicators: IndicatorSnapshot,
    /// The trailing candle window the indicators were computed from.
    pub candles: Vec<Candle>,
    pub open_position: Option<Position>,
}

/// The core trait all decision providers implement.
///
/// Implementations must be `Send + Sync`; the orchestrator shares one
/// provider across every strategy task. Calls are wrapped in a timeout by
/// the caller, so a provider does not need its own deadline handling.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Produces one immutable `Decision` for the given market context.
    async fn decide(
        &self,
        context: &MarketContext,
        config: &StrategyConfig,
    ) -> Result<Decision, StrategyError>;
}
