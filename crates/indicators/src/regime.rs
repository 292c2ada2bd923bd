use crate::snapshot::IndicatorSnapshot;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::hash::{Hash, Hasher};

/// A coarse fingerprint of market conditions.
///
/// Two ticks hash equal when price sits in the same 0.5% log-bucket, RSI
/// rounds to the same multiple of 5, volatility falls in the same 0.5%
/// bucket and the trend sign matches. Deliberately not float-exact: the
/// hash answers "has the regime moved?", so a cached decision can be reused
/// until it has or until its time ceiling expires.
pub fn regime_hash(price: Decimal, snapshot: &IndicatorSnapshot) -> u64 {
    let price_bucket = match price.to_f64() {
        Some(p) if p > 0.0 => (p.ln() / 0.005).round() as i64,
        _ => 0,
    };
    let rsi_bucket = (snapshot.rsi / Decimal::from(5))
        .round()
        .to_i64()
        .unwrap_or(0);
    let volatility_bucket = match snapshot.volatility.to_f64() {
        Some(v) if v.is_finite() => (v / 0.005).round() as i64,
        _ => 0,
    };

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    price_bucket.hash(&mut hasher);
    rsi_bucket.hash(&mut hasher);
    volatility_bucket.hash(&mut hasher);
    snapshot.trend.sign().hash(&mut hasher);
    hasher.finish()
}
