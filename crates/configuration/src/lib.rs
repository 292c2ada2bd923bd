// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod timeframe;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    Config, DecisionSettings, ExecutionSettings, LiveSettings, RiskLimits, RuleParams,
    SplitSettings, StrategyConfig, TradingCosts,
};
pub use timeframe::parse_timeframe;

/// Loads and validates the application configuration from a TOML file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, deserializes it into our strongly-typed `Config`
/// struct, and runs the fail-fast validation pass. A config with a missing
/// required risk limit never makes it past this point; we do not substitute
/// defaults for required limits.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
