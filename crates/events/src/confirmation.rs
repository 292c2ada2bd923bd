use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Details supplied by the external signer after it has signed and submitted
/// a pending trade. Fed back into the orchestrator's `record_trade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeConfirmation {
    /// The chain transaction signature, used for the confirmation poll.
    pub tx_signature: String,
    pub executed_price: Decimal,
    pub executed_size: Decimal,
    pub fees: Decimal,
    pub submitted_at: DateTime<Utc>,
}
