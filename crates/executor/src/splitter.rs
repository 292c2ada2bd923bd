use crate::engine::{ExecutionEngine, ExecutionResult};
use crate::error::ExecutorError;
use crate::routes::{ExecutionOptions, QuoteParams};
use async_trait::async_trait;
use configuration::SplitSettings;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// One slice of a TWAP order. `delay_ms` is the scheduled offset from the
/// start of the execution window, not a gap from the previous chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChunk {
    pub index: u32,
    pub amount: Decimal,
    pub delay_ms: u64,
}

/// Per-chunk execution report. A failed chunk is a reportable outcome, not a
/// reason to abort the rest of the schedule.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunk: OrderChunk,
    pub result: Result<ExecutionResult, ExecutorError>,
}

/// The capability the splitter needs to run a single chunk. Implemented by
/// `ExecutionEngine`; tests substitute stubs.
#[async_trait]
pub trait ChunkExecutor: Send + Sync {
    async fn execute_chunk(
        &self,
        params: &QuoteParams,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError>;
}

#[async_trait]
impl ChunkExecutor for ExecutionEngine {
    async fn execute_chunk(
        &self,
        params: &QuoteParams,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.execute_trade(params, options).await
    }
}

/// True when the order's notional clears the configured split threshold.
pub fn should_split_order(size: Decimal, price: Decimal, config: &SplitSettings) -> bool {
    size * price > config.min_split_notional
}

/// Slices an order into equal time-spaced chunks.
///
/// Chunk amounts are rounded to 8 decimal places and the last chunk absorbs
/// the remainder, so the amounts always sum to exactly the original size
/// with no cumulative rounding drift. Delays spread the chunks evenly across the
/// configured window.
pub fn split_order(params: &QuoteParams, config: &SplitSettings) -> Vec<OrderChunk> {
    let n = config.num_chunks.max(1);
    let base = (params.size / Decimal::from(n)).round_dp(8);
    let spacing = config.time_window_ms / u64::from(n);

    (0..n)
        .map(|i| {
            let amount = if i == n - 1 {
                params.size - base * Decimal::from(n - 1)
            } else {
                base
            };
            OrderChunk {
                index: i,
                amount,
                delay_ms: u64::from(i) * spacing,
            }
        })
        .collect()
}

/// Chunk-count heuristic: larger notional, more chunks.
pub fn calculate_optimal_chunks(size: Decimal, price: Decimal) -> u32 {
    let notional = size * price;
    if notional <= dec!(5000) {
        4
    } else if notional <= dec!(25000) {
        6
    } else if notional <= dec!(100000) {
        8
    } else {
        12
    }
}

/// Time-window heuristic: larger notional stretches the window, higher
/// volatility shortens it (less exposure to adverse moves while slicing).
pub fn calculate_optimal_time_window(
    size: Decimal,
    price: Decimal,
    volatility: Option<Decimal>,
) -> u64 {
    let notional = size * price;
    let base_ms: u64 = if notional <= dec!(5000) {
        45_000
    } else if notional <= dec!(25000) {
        90_000
    } else if notional <= dec!(100000) {
        180_000
    } else {
        300_000
    };

    let scaled = match volatility {
        Some(v) if v >= dec!(0.05) => base_ms / 3,
        Some(v) if v >= dec!(0.02) => base_ms / 2,
        _ => base_ms,
    };
    scaled.max(15_000)
}

/// Runs a chunk schedule sequentially, waiting out each chunk's offset and
/// continuing past failures. Partial fills are a valid, reportable outcome.
///
/// The optional `on_chunk` hook observes each outcome as it lands, for
/// callers that want progress reporting while the window is still open.
pub async fn execute_split_order(
    chunks: Vec<OrderChunk>,
    executor: &dyn ChunkExecutor,
    base_params: &QuoteParams,
    options: &ExecutionOptions,
    on_chunk: Option<&(dyn Fn(&ChunkOutcome) + Send + Sync)>,
) -> Vec<ChunkOutcome> {
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if chunk.delay_ms > elapsed_ms {
            sleep(Duration::from_millis(chunk.delay_ms - elapsed_ms)).await;
        }

        let chunk_params = QuoteParams {
            size: chunk.amount,
            ..base_params.clone()
        };
        let result = executor.execute_chunk(&chunk_params, options).await;
        if let Err(e) = &result {
            tracing::warn!(chunk = chunk.index, error = %e, "chunk failed, continuing schedule");
        }

        let outcome = ChunkOutcome { chunk, result };
        if let Some(hook) = on_chunk {
            hook(&outcome);
        }
        outcomes.push(outcome);
    }

    outcomes
}
