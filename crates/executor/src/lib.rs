//! # Meridian Executor Crate
//!
//! This crate turns an admitted trade into an unsigned swap transaction. It
//! provides the multi-route `ExecutionEngine` with ordered fallback and
//! latency accounting, and the TWAP `splitter` for orders large enough to
//! move the market.
//!
//! ## Architectural Principles
//!
//! - **Pure Chain, Isolated I/O:** Route-chain construction is a pure
//!   function of the call's options; route *execution* is the only I/O
//!   boundary, isolated behind the `SwapRoute` trait so the ordering and
//!   fallback logic is independently testable with stub routes.
//! - **Stateless Per Call:** Neither the engine's route chain nor the
//!   splitter's chunk schedule holds mutable state across calls, so multiple
//!   strategies may execute concurrently without coordination.
//! - **Static Ordering:** Routes are tried strictly in registration order.
//!   There is no adaptive reordering by historical success rate; the chain
//!   builder is the seam where such a policy would slot in.
//!
//! ## Public API
//!
//! - `SwapRoute`: the capability trait each quote/execution venue implements.
//! - `ExecutionEngine`: ordered-fallback trade execution.
//! - `splitter`: TWAP order slicing and best-effort chunk execution.
//! - `PaperRoute`: the deterministic simulated route for paper trading.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

pub mod engine;
pub mod error;
pub mod paper;
pub mod routes;
pub mod splitter;

// Re-export the key components to provide a clean, public-facing API.
pub use engine::{ExecutionEngine, ExecutionResult};
pub use error::ExecutorError;
pub use paper::PaperRoute;
pub use routes::{ExecutionOptions, Quote, QuoteParams, SwapRoute};
pub use splitter::{
    calculate_optimal_chunks, calculate_optimal_time_window, execute_split_order,
    should_split_order, split_order, ChunkExecutor, ChunkOutcome, OrderChunk,
};
