use crate::error::ExecutorError;
use crate::routes::{Quote, QuoteParams, SwapRoute};
use async_trait::async_trait;
use core_types::UnsignedSwap;
use rust_decimal::Decimal;

/// The "virtual venue" for paper trading.
///
/// Quotes exactly at the caller's hinted price and emits a synthetic payload
/// in place of a real serialized transaction. Deterministic given its
/// inputs, which keeps paper sessions and tests reproducible.
pub struct PaperRoute {
    id: String,
}

impl PaperRoute {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for PaperRoute {
    fn default() -> Self {
        Self::new("paper")
    }
}

#[async_trait]
impl SwapRoute for PaperRoute {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_quote(&self, params: &QuoteParams) -> Result<Quote, ExecutorError> {
        if params.price_hint <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(
                "paper route needs a positive price hint".to_string(),
            ));
        }
        Ok(Quote {
            source_id: self.id.clone(),
            price: params.price_hint,
            amount_out: params.size * params.price_hint,
        })
    }

    async fn build_swap_tx(&self, params: &QuoteParams) -> Result<UnsignedSwap, ExecutorError> {
        Ok(UnsignedSwap {
            source_id: self.id.clone(),
            chain: params.chain,
            payload: format!(
                "paper:{}:{:?}:{}@{}",
                params.symbol, params.side, params.size, params.price_hint
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Chain, TradeSide};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn paper_route_quotes_at_the_hinted_price() {
        let route = PaperRoute::default();
        let params = QuoteParams {
            symbol: "SOL/USDC".to_string(),
            side: TradeSide::Long,
            size: dec!(2),
            price_hint: dec!(150),
            chain: Chain::Solana,
        };
        let quote = route.get_quote(&params).await.unwrap();
        assert_eq!(quote.price, dec!(150));
        assert_eq!(quote.amount_out, dec!(300));

        let swap = route.build_swap_tx(&params).await.unwrap();
        assert_eq!(swap.chain, Chain::Solana);
        assert!(swap.payload.starts_with("paper:SOL/USDC"));
    }
}
