use core_types::{PerformanceSnapshot, Trade};

/// The outbound persistence contract.
///
/// The core computes results whether or not a sink is attached; callers that
/// want trades or snapshots stored implement this and inject it. Both hooks
/// are infallible from the core's point of view: a sink that fails must deal
/// with that failure itself rather than halting a simulation or a live tick.
pub trait PersistenceSink: Send + Sync {
    /// Called once for every closed trade, in ledger order.
    fn on_trade(&self, trade: &Trade);

    /// Called at a bounded cadence with a point-in-time performance reading.
    fn on_snapshot(&self, snapshot: &PerformanceSnapshot);
}

/// A sink that discards everything. Useful as an explicit default.
#[derive(Debug, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn on_trade(&self, _trade: &Trade) {}
    fn on_snapshot(&self, _snapshot: &PerformanceSnapshot) {}
}
