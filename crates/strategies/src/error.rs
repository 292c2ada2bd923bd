use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Decision provider received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Decision provider failure: {0}")]
    Provider(String),

    #[error("An error occurred during indicator evaluation: {0}")]
    Indicator(#[from] indicators::IndicatorError),
}
