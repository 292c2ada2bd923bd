use crate::error::ConfigError;
use crate::timeframe::parse_timeframe;
use core_types::Chain;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;

/// The root configuration structure for the trading core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub decision: DecisionSettings,
    #[serde(default)]
    pub live: LiveSettings,
}

/// One declaratively-defined strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Unique identifier, used as the key for all per-strategy state.
    pub id: String,
    /// The symbol universe this strategy trades.
    pub symbols: Vec<String>,
    /// Polling cadence, e.g. "5m" or "1h".
    pub timeframe: String,
    pub chain: Chain,
    /// Session equity the strategy starts from; updated with realized PnL.
    pub initial_equity: Decimal,
    pub risk: RiskLimits,
    #[serde(default)]
    pub costs: TradingCosts,
    #[serde(default)]
    pub rule: RuleParams,
}

/// Hard limits the core may narrow but never widen.
///
/// `max_position_pct` and `max_daily_loss_pct` are required; deserialization
/// fails if they are absent. The optional limits simply don't apply when
/// unset.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum position size as a percentage of equity, in (0, 100].
    pub max_position_pct: Decimal,
    /// Daily realized-loss limit as a percentage of equity, > 0.
    pub max_daily_loss_pct: Decimal,
    pub stop_loss_pct: Option<Decimal>,
    pub take_profit_pct: Option<Decimal>,
    pub trailing_stop_pct: Option<Decimal>,
    pub max_leverage: Option<Decimal>,
    /// Upper bound applied to the Kelly-derived sizing fraction.
    pub kelly_fraction_cap_pct: Option<Decimal>,
    /// Hard ceiling on running drawdown; admission fails beyond it.
    pub max_drawdown_pct: Option<Decimal>,
}

/// Fee and slippage rates applied to notional in simulation and sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingCosts {
    pub fee_pct: Decimal,
    pub slippage_pct: Decimal,
}

impl Default for TradingCosts {
    fn default() -> Self {
        Self {
            fee_pct: dec!(0.001),
            slippage_pct: dec!(0.0005),
        }
    }
}

/// Thresholds for the deterministic rule-based decision function.
///
/// These are strategy-template parameters, not risk limits, so defaults are
/// acceptable here.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleParams {
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
    /// Position size (pct of equity) the rule proposes on a signal.
    pub entry_size_pct: Decimal,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            rsi_oversold: dec!(30),
            rsi_overbought: dec!(70),
            entry_size_pct: dec!(10),
        }
    }
}

/// Settings for the decision provider and its cache.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionSettings {
    /// Hard ceiling on one provider call; on expiry the tick falls back to
    /// the rule-based path.
    pub provider_timeout_secs: u64,
    /// Minimum age before a cached decision is re-derived, absent a regime
    /// change.
    pub min_redecision_interval_secs: u64,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            provider_timeout_secs: 10,
            min_redecision_interval_secs: 300,
        }
    }
}

/// Settings for the route-fallback execution engine and the TWAP splitter.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSettings {
    /// Fixed pause between a failed route and the next one in the chain.
    pub route_backoff_ms: u64,
    /// Whether gasless routes join the end of the route chain.
    pub gasless_enabled: bool,
    #[serde(default)]
    pub split: SplitSettings,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            route_backoff_ms: 250,
            gasless_enabled: false,
            split: SplitSettings::default(),
        }
    }
}

/// TWAP order-splitting parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitSettings {
    /// Orders whose notional exceeds this are sliced.
    pub min_split_notional: Decimal,
    pub num_chunks: u32,
    /// Window the chunks are spread across.
    pub time_window_ms: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            min_split_notional: dec!(1000),
            num_chunks: 4,
            time_window_ms: 45_000,
        }
    }
}

/// Live-trading safety and confirmation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSettings {
    /// Global gate: strategies on Solana refuse to start while this is off.
    pub live_solana_enabled: bool,
    pub confirmation_poll_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            live_solana_enabled: false,
            confirmation_poll_secs: 5,
            confirmation_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Fail-fast validation of everything a strategy needs to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for strategy in &self.strategies {
            if !seen.insert(strategy.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate strategy id '{}'",
                    strategy.id
                )));
            }
            strategy.validate()?;
        }
        Ok(())
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "strategy '{}' has an empty symbol universe",
                self.id
            )));
        }
        parse_timeframe(&self.timeframe)?;
        if self.initial_equity <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "strategy '{}': initial_equity must be positive",
                self.id
            )));
        }
        self.risk.validate(&self.id)?;
        Ok(())
    }
}

impl RiskLimits {
    fn validate(&self, strategy_id: &str) -> Result<(), ConfigError> {
        if self.max_position_pct <= Decimal::ZERO || self.max_position_pct > dec!(100) {
            return Err(ConfigError::ValidationError(format!(
                "strategy '{strategy_id}': max_position_pct must be in (0, 100]"
            )));
        }
        if self.max_daily_loss_pct <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "strategy '{strategy_id}': max_daily_loss_pct must be positive"
            )));
        }
        for (name, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("trailing_stop_pct", self.trailing_stop_pct),
            ("max_leverage", self.max_leverage),
            ("kelly_fraction_cap_pct", self.kelly_fraction_cap_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
        ] {
            if let Some(v) = value {
                if v <= Decimal::ZERO {
                    return Err(ConfigError::ValidationError(format!(
                        "strategy '{strategy_id}': {name} must be positive when set"
                    )));
                }
            }
        }
        Ok(())
    }
}
