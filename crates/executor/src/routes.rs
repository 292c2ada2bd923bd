use crate::error::ExecutorError;
use async_trait::async_trait;
use core_types::{Chain, TradeSide, UnsignedSwap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters for one swap quote/build request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteParams {
    pub symbol: String,
    pub side: TradeSide,
    pub size: Decimal,
    /// The price the caller last observed; routes quote around it.
    pub price_hint: Decimal,
    pub chain: Chain,
}

/// A quote returned by a route, before the unsigned transaction is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub source_id: String,
    pub price: Decimal,
    pub amount_out: Decimal,
}

/// Per-call execution flags, resolved from configuration by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionOptions {
    /// When set, gasless routes join the end of the route chain.
    pub gasless_enabled: bool,
}

/// One quote/execution venue: a DEX aggregator, an RFQ desk, a gasless relay.
///
/// Implementations own their protocol details and retries; the engine only
/// sees ordered fallback. Everything behind this trait is a collaborator;
/// the core never talks to a chain directly.
#[async_trait]
pub trait SwapRoute: Send + Sync {
    /// Stable identifier recorded in execution results.
    fn id(&self) -> &str;

    /// Gasless routes are only eligible when the caller enables them.
    fn is_gasless(&self) -> bool {
        false
    }

    async fn get_quote(&self, params: &QuoteParams) -> Result<Quote, ExecutorError>;

    async fn build_swap_tx(&self, params: &QuoteParams) -> Result<UnsignedSwap, ExecutorError>;
}
