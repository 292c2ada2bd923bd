//! # Meridian Indicators
//!
//! Derives a per-tick `IndicatorSnapshot` (RSI, EMAs, MACD, Bollinger bands,
//! ATR, volatility, trend) from a trailing window of candles, plus the
//! coarse regime hash the live engine uses to decide whether a cached
//! decision is still valid.
//!
//! Snapshots are recomputed every tick and never persisted independently of
//! the decision that used them.

pub mod error;
pub mod regime;
pub mod snapshot;

pub use error::IndicatorError;
pub use regime::regime_hash;
pub use snapshot::{IndicatorSnapshot, TrendDirection, MIN_BARS};
