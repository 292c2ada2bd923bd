pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Chain, DecisionAction, TradeSide};
pub use error::CoreError;
pub use structs::{
    Candle, Decision, PendingTrade, PerformanceSnapshot, Position, Trade, TwapChunk,
    UnsignedOrder, UnsignedSwap,
};
