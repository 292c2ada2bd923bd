//! # Meridian Market Data
//!
//! The abstract interface to whatever supplies candles: an exchange client,
//! a DEX indexer, a replay file. The core never fetches, caches or
//! rate-limits upstream data itself; it consumes this trait and treats the
//! implementation as a collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Candle, Chain};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Upstream market-data failure: {0}")]
    Upstream(String),

    #[error("No data available for symbol '{0}'")]
    NoData(String),
}

/// The latest market reading for one symbol on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub candle: Candle,
    pub vwap: Option<Decimal>,
    pub dex_volume_usd_24h: Option<Decimal>,
}

/// A historical candle request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub timeframe: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub chain: Chain,
}

/// The market-data capability consumed by the live orchestrator.
///
/// Implementations own retries and caching at their boundary; the core wraps
/// each call in a timeout so a slow upstream cannot stall a strategy tick.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches the most recent snapshot, or `None` when the upstream has no
    /// bar yet for this symbol/timeframe.
    async fn get_latest_snapshot(
        &self,
        symbol: &str,
        timeframe: &str,
        chain: Chain,
    ) -> Result<Option<MarketSnapshot>, MarketDataError>;

    /// Fetches a validated (sorted, de-duplicated) historical candle series.
    async fn get_historical_candles(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
