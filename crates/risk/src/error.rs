use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Risk parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("Insufficient portfolio equity ({0}) to evaluate risk rules.")]
    InsufficientEquity(Decimal),
}
