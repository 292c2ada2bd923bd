use chrono::{DateTime, Utc};
use core_types::Decision;

/// The single cached decision a strategy may hold.
///
/// A cached entry is reused only while it is younger than the configured
/// re-decision interval AND the market regime hash still matches; whichever
/// expires first forces a fresh provider call. This throttles expensive
/// decision calls to regime changes or a time ceiling.
#[derive(Debug, Clone)]
pub struct CachedDecision {
    pub symbol: String,
    pub decision: Decision,
    pub regime: u64,
    pub decided_at: DateTime<Utc>,
}

impl CachedDecision {
    /// Whether this entry still answers for the given symbol and regime.
    pub fn is_fresh(&self, symbol: &str, regime: u64, now: DateTime<Utc>, max_age_secs: u64) -> bool {
        self.symbol == symbol
            && self.regime == regime
            && (now - self.decided_at).num_seconds() >= 0
            && (now - self.decided_at).num_seconds() < max_age_secs as i64
    }
}
