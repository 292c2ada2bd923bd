use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("Strategy '{0}' is already running.")]
    StrategyAlreadyRunning(String),

    #[error("Strategy '{0}' is not running.")]
    StrategyNotRunning(String),

    #[error("Strategy '{0}' targets Solana but live Solana trading is disabled.")]
    LiveSolanaDisabled(String),

    #[error("Strategy '{0}' has no pending trade to record.")]
    NoPendingTrade(String),

    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),

    #[error("Indicator calculation error: {0}")]
    Indicator(#[from] indicators::IndicatorError),

    #[error("Order construction error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("Decision provider error: {0}")]
    Strategy(#[from] strategies::StrategyError),
}
