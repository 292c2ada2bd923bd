use crate::error::ConfigError;
use std::time::Duration;

/// Parses a timeframe string like "1m", "15m", "1h", "4h" or "1d" into the
/// polling interval it denotes.
///
/// A bad timeframe is a configuration error and fails at strategy start;
/// nothing downstream ever re-validates it.
pub fn parse_timeframe(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s.len() < 2 {
        return Err(ConfigError::InvalidTimeframe(s.to_string()));
    }

    let (value, unit) = s.split_at(s.len() - 1);
    let n: u64 = value
        .parse()
        .map_err(|_| ConfigError::InvalidTimeframe(s.to_string()))?;
    if n == 0 {
        return Err(ConfigError::InvalidTimeframe(s.to_string()));
    }

    let secs = match unit {
        "m" => n * 60,
        "h" => n * 3_600,
        "d" => n * 86_400,
        _ => return Err(ConfigError::InvalidTimeframe(s.to_string())),
    };

    Ok(Duration::from_secs(secs))
}
