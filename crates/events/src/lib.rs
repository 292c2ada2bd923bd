//! # Meridian Events
//!
//! This crate defines the event contract between the trading core and the
//! outside world: the optional persistence sink the backtester and live
//! engine report into, and the confirmation details an external signer
//! feeds back after submitting a trade.
//!
//! As a Layer 0 crate, it depends only on `core-types`. Keeping these
//! contracts here lets the backtester stay testable without any storage
//! dependency.

pub mod confirmation;
pub mod sink;

pub use confirmation::TradeConfirmation;
pub use sink::{NullSink, PersistenceSink};
