use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

/// What the chain eventually reports about a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationDetails {
    pub confirmed_at: DateTime<Utc>,
    pub executed_price: Decimal,
    pub fee: Decimal,
}

/// The capability that answers "has this transaction landed yet?". A chain
/// RPC client in production, a stub in tests.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    /// `Ok(None)` means "not confirmed yet, keep polling".
    async fn check(&self, tx_signature: &str) -> Result<Option<ConfirmationDetails>, String>;
}

/// Polls for a transaction confirmation on a bounded schedule.
///
/// A plain retry loop with an explicit deadline and a cancellation channel:
/// checks every `poll_interval` until `deadline_after` has elapsed or the
/// owning strategy stops. Failure and timeout are logged, never fatal: the
/// confirmation only feeds execution-quality metrics.
pub async fn poll_confirmation(
    source: Arc<dyn ConfirmationSource>,
    tx_signature: String,
    expected_price: Decimal,
    poll_interval: Duration,
    deadline_after: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Option<ConfirmationDetails> {
    let deadline = Instant::now() + deadline_after;

    loop {
        if Instant::now() >= deadline {
            tracing::warn!(tx = %tx_signature, "confirmation poll hit its deadline");
            return None;
        }

        match source.check(&tx_signature).await {
            Ok(Some(details)) => {
                let deviation_pct = if expected_price > Decimal::ZERO {
                    (details.executed_price - expected_price) / expected_price
                        * Decimal::from(100)
                } else {
                    Decimal::ZERO
                };
                tracing::info!(
                    tx = %tx_signature,
                    executed_price = %details.executed_price,
                    deviation_pct = %deviation_pct.round_dp(4),
                    "trade confirmed"
                );
                return Some(details);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tx = %tx_signature, error = %e, "confirmation check failed");
            }
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    tracing::debug!(tx = %tx_signature, "confirmation poll cancelled");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Confirms on the Nth check.
    struct EventualSource {
        checks: AtomicU32,
        confirm_on: u32,
    }

    #[async_trait]
    impl ConfirmationSource for EventualSource {
        async fn check(&self, _tx: &str) -> Result<Option<ConfirmationDetails>, String> {
            let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.confirm_on {
                Ok(Some(ConfirmationDetails {
                    confirmed_at: Utc::now(),
                    executed_price: Decimal::from(101),
                    fee: Decimal::ONE,
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn confirms_after_a_few_polls() {
        let source = Arc::new(EventualSource {
            checks: AtomicU32::new(0),
            confirm_on: 3,
        });
        let (_tx, rx) = watch::channel(false);
        let details = poll_confirmation(
            source,
            "sig".to_string(),
            Decimal::from(100),
            Duration::from_millis(5),
            Duration::from_secs(5),
            rx,
        )
        .await;
        assert!(details.is_some());
    }

    #[tokio::test]
    async fn gives_up_at_the_deadline() {
        let source = Arc::new(EventualSource {
            checks: AtomicU32::new(0),
            confirm_on: u32::MAX,
        });
        let (_tx, rx) = watch::channel(false);
        let details = poll_confirmation(
            source,
            "sig".to_string(),
            Decimal::from(100),
            Duration::from_millis(5),
            Duration::from_millis(20),
            rx,
        )
        .await;
        assert!(details.is_none());
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let source = Arc::new(EventualSource {
            checks: AtomicU32::new(0),
            confirm_on: u32::MAX,
        });
        let (tx, rx) = watch::channel(false);
        let poll = tokio::spawn(poll_confirmation(
            source,
            "sig".to_string(),
            Decimal::from(100),
            Duration::from_millis(50),
            Duration::from_secs(60),
            rx,
        ));
        tx.send(true).unwrap();
        let details = poll.await.unwrap();
        assert!(details.is_none());
    }
}
