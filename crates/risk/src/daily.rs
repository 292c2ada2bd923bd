use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

/// Tracks realized PnL over a rolling 24-hour window.
///
/// The window is anchored to the first tick the tracker observes, not to
/// wall-clock midnight, and rolls forward exactly once per elapsed 24 hours.
/// The tracker holds no clock of its own; callers pass tick timestamps in,
/// which keeps backtests and live sessions on identical behavior.
#[derive(Debug, Clone, Default)]
pub struct DailyLossTracker {
    window_start: Option<DateTime<Utc>>,
    realized_pnl: Decimal,
}

impl DailyLossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a tick timestamp, rolling the window when 24 hours have
    /// elapsed since it was anchored. Rolling resets the accumulated PnL.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        match self.window_start {
            None => self.window_start = Some(now),
            Some(start) => {
                if now - start >= Duration::hours(24) {
                    // Advance in whole 24h steps so a long gap cannot anchor
                    // the window to an arbitrary tick time.
                    let elapsed_days = (now - start).num_days().max(1);
                    self.window_start = Some(start + Duration::days(elapsed_days));
                    self.realized_pnl = Decimal::ZERO;
                }
            }
        }
    }

    /// Accumulates realized PnL from a closed trade into the current window.
    pub fn record(&mut self, pnl: Decimal) {
        self.realized_pnl += pnl;
    }

    /// The realized PnL of the current window.
    pub fn daily_pnl(&self) -> Decimal {
        self.realized_pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + hours * 3600, 0).unwrap()
    }

    #[test]
    fn window_anchors_to_the_first_observed_tick() {
        let mut tracker = DailyLossTracker::new();
        tracker.observe(t(0));
        tracker.record(dec!(-10));

        // 23 hours later the window has not rolled.
        tracker.observe(t(23));
        assert_eq!(tracker.daily_pnl(), dec!(-10));

        // 24 hours later it has, exactly once.
        tracker.observe(t(24));
        assert_eq!(tracker.daily_pnl(), Decimal::ZERO);
    }

    #[test]
    fn losses_accumulate_within_one_window() {
        let mut tracker = DailyLossTracker::new();
        tracker.observe(t(0));
        tracker.record(dec!(-3));
        tracker.record(dec!(1));
        tracker.record(dec!(-4));
        assert_eq!(tracker.daily_pnl(), dec!(-6));
    }

    #[test]
    fn a_multi_day_gap_rolls_in_whole_day_steps() {
        let mut tracker = DailyLossTracker::new();
        tracker.observe(t(0));
        tracker.record(dec!(-10));

        // 2.5 days later: the window rolls and stays anchored on the
        // original 24h grid (next roll is at hour 72, not hour 84).
        tracker.observe(t(60));
        assert_eq!(tracker.daily_pnl(), Decimal::ZERO);
        tracker.record(dec!(-5));

        tracker.observe(t(71));
        assert_eq!(tracker.daily_pnl(), dec!(-5));
        tracker.observe(t(72));
        assert_eq!(tracker.daily_pnl(), Decimal::ZERO);
    }
}
