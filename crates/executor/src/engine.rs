use crate::error::ExecutorError;
use crate::routes::{ExecutionOptions, Quote, QuoteParams, SwapRoute};
use core_types::UnsignedSwap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// The outcome of one `execute_trade` call: the unsigned swap plus the
/// observability fields callers record. Transient; the core never persists
/// these.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub swap: UnsignedSwap,
    pub quote: Quote,
    /// Which route served the request.
    pub source_id: String,
    pub latency: Duration,
    /// True when any route beyond the first in the chain served the request.
    pub fallback_used: bool,
    pub attempts: u32,
}

/// Tries an ordered list of swap routes until one succeeds.
///
/// State machine per call: `Idle → TryRoute(i) → {Success | TryRoute(i+1) |
/// AllFailed}`. The engine holds no per-call mutable state, so concurrent
/// strategies share one instance freely.
pub struct ExecutionEngine {
    routes: Vec<Arc<dyn SwapRoute>>,
    backoff: Duration,
}

impl ExecutionEngine {
    /// Builds an engine over routes in fallback order: primary first.
    pub fn new(routes: Vec<Arc<dyn SwapRoute>>, backoff: Duration) -> Self {
        Self { routes, backoff }
    }

    /// The route chain for one call. Pure given the options: registration
    /// order, with gasless routes included only when the caller enabled
    /// them. No dynamic re-ordering.
    pub fn build_route_chain(&self, options: &ExecutionOptions) -> Vec<Arc<dyn SwapRoute>> {
        self.routes
            .iter()
            .filter(|route| options.gasless_enabled || !route.is_gasless())
            .cloned()
            .collect()
    }

    /// Executes one desired swap, falling back through the route chain.
    ///
    /// On success the result records which route served the request, the
    /// elapsed latency and whether fallback was needed. When every route
    /// fails, the aggregate error names the attempt count and the last
    /// underlying failure; the caller treats that as terminal for this one
    /// trade attempt only.
    pub async fn execute_trade(
        &self,
        params: &QuoteParams,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        if params.size <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(format!(
                "non-positive swap size {}",
                params.size
            )));
        }

        let chain = self.build_route_chain(options);
        if chain.is_empty() {
            return Err(ExecutorError::NoRoutesAvailable);
        }

        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_error = String::new();

        for (index, route) in chain.iter().enumerate() {
            if attempts > 0 {
                sleep(self.backoff).await;
            }
            attempts += 1;

            match Self::try_route(route.as_ref(), params).await {
                Ok((quote, swap)) => {
                    let result = ExecutionResult {
                        source_id: route.id().to_string(),
                        latency: started.elapsed(),
                        fallback_used: index > 0,
                        attempts,
                        quote,
                        swap,
                    };
                    tracing::debug!(
                        route = result.source_id,
                        latency_ms = result.latency.as_millis() as u64,
                        fallback = result.fallback_used,
                        "swap built"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(route = route.id(), error = %e, "route failed, trying next");
                    last_error = e.to_string();
                }
            }
        }

        Err(ExecutorError::AllRoutesFailed {
            attempts,
            last_error,
        })
    }

    async fn try_route(
        route: &dyn SwapRoute,
        params: &QuoteParams,
    ) -> Result<(Quote, UnsignedSwap), ExecutorError> {
        let quote = route.get_quote(params).await?;
        let swap = route.build_swap_tx(params).await?;
        Ok((quote, swap))
    }
}
