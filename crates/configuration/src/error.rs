use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    #[error("Invalid timeframe string '{0}': expected <number><m|h|d>, e.g. \"5m\" or \"1h\"")]
    InvalidTimeframe(String),
}
