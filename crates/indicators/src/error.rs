use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Not enough candles for an indicator window: need {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("An error occurred during indicator calculation: {0}")]
    Calculation(String),
}
