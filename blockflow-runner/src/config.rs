//! Simulation configuration — serde structs loadable from TOML.
//!
//! A config file carries two tables:
//!
//! ```toml
//! [simulation]
//! period_start = "2024-01-01T00:00:00Z"
//! period_end = "2024-01-02T00:00:00Z"
//! initial_capital = 10000.0
//! mode = "synthetic"
//!
//! [validator]
//! strict = false
//! ```
//!
//! Timestamps are quoted RFC 3339 strings. Every field has a default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use blockflow_core::data::{AlignmentPolicy, MarketConditions, RegimeTables};
use blockflow_core::engine::EngineConfig;
use blockflow_core::validator::ValidatorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("initial_capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("period_end ({end}) must be after period_start ({start})")]
    EmptyPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("gas_cost_per_tx must be non-negative, got {0}")]
    NegativeGas(f64),

    #[error("max_workers must be at least 1")]
    ZeroWorkers,

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Where tick prices come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMode {
    #[default]
    Synthetic,
    Historical,
}

/// Parameters of a backtest, Monte Carlo batch or sandbox run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// First tick (inclusive).
    pub period_start: DateTime<Utc>,
    /// End of the period (exclusive).
    pub period_end: DateTime<Utc>,
    pub initial_capital: f64,
    pub mode: PriceMode,
    /// Regime for single synthetic backtests. Monte Carlo resamples it per run.
    pub market_conditions: MarketConditions,
    pub regimes: RegimeTables,
    pub quote_token: String,
    pub gas_cost_per_tx: f64,
    pub min_trade_value: f64,
    /// Annual rate as a fraction.
    pub risk_free_rate: f64,
    /// Wall-clock budget per backtest; `None` disables the limit.
    pub max_duration_secs: Option<f64>,
    pub max_workers: usize,
    pub seed: u64,
    pub alignment: AlignmentPolicy,
    /// Starting prices for synthetic walks and fallbacks for missing data.
    pub initial_prices: BTreeMap<String, f64>,
    pub sandbox_hours: u32,
}

/// Available parallelism, capped at 8.
pub fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

fn default_period_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let start = default_period_start();
        Self {
            period_start: start,
            period_end: start + chrono::Duration::hours(24),
            initial_capital: 10_000.0,
            mode: PriceMode::Synthetic,
            market_conditions: MarketConditions::default(),
            regimes: RegimeTables::default(),
            quote_token: "USDT".to_string(),
            gas_cost_per_tx: 0.05,
            min_trade_value: 1.0,
            risk_free_rate: 0.02,
            max_duration_secs: Some(30.0),
            max_workers: default_max_workers(),
            seed: 42,
            alignment: AlignmentPolicy::ByIndex,
            initial_prices: BTreeMap::new(),
            sandbox_hours: 24,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Reject values no simulation can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital > 0.0) || !self.initial_capital.is_finite() {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if self.period_end <= self.period_start {
            return Err(ConfigError::EmptyPeriod {
                start: self.period_start,
                end: self.period_end,
            });
        }
        if !(self.gas_cost_per_tx >= 0.0) {
            return Err(ConfigError::NegativeGas(self.gas_cost_per_tx));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if !(self.min_trade_value >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_trade_value",
                message: format!("must be non-negative, got {}", self.min_trade_value),
            });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid {
                field: "risk_free_rate",
                message: "must be finite".into(),
            });
        }
        if let Some(secs) = self.max_duration_secs {
            if !(secs >= 0.0) || Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::Invalid {
                    field: "max_duration_secs",
                    message: format!("must be a representable non-negative duration, got {secs}"),
                });
            }
        }
        if self.quote_token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "quote_token",
                message: "must not be empty".into(),
            });
        }
        if let Some((token, price)) = self.initial_prices.iter().find(|(_, p)| !(**p > 0.0)) {
            return Err(ConfigError::Invalid {
                field: "initial_prices",
                message: format!("price for '{token}' must be positive, got {price}"),
            });
        }
        Ok(())
    }

    /// Length of the period in days (fractional).
    pub fn period_days(&self) -> f64 {
        (self.period_end - self.period_start).num_seconds() as f64 / 86_400.0
    }

    /// The same config with the period replaced by `[start, start + hours)`.
    pub fn with_hours(&self, hours: u32) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        config.period_end = chrono::Duration::try_hours(i64::from(hours))
            .and_then(|span| config.period_start.checked_add_signed(span))
            .ok_or_else(|| ConfigError::Invalid {
                field: "period_end",
                message: format!("{hours} hours after {} is out of range", config.period_start),
            })?;
        Ok(config)
    }

    /// Engine settings for one run under a liquidity-derived slippage multiplier.
    pub fn engine_config(&self, slippage_multiplier: f64) -> EngineConfig {
        EngineConfig {
            initial_capital: self.initial_capital,
            quote_token: self.quote_token.clone(),
            gas_cost_per_tx: self.gas_cost_per_tx,
            min_trade_value: self.min_trade_value,
            slippage_multiplier,
            fallback_prices: self.initial_prices.clone(),
            max_duration: self
                .max_duration_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        }
    }
}

// ─── Combined config file ───────────────────────────────────────────

/// The `[simulation]` and `[validator]` tables of one config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockflowConfig {
    pub simulation: SimulationConfig,
    pub validator: ValidatorConfig,
}

impl BlockflowConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.simulation.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_core::data::{Level, Trend};

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.period_days(), 1.0);
        assert!(config.max_workers >= 1 && config.max_workers <= 8);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            initial_capital = 500.0
            period_end = "2024-01-03T00:00:00Z"

            [market_conditions]
            volatility = "high"
            trend = "bull"
            liquidity = "low"
            "#,
        )
        .unwrap();
        assert_eq!(config.initial_capital, 500.0);
        assert_eq!(config.period_days(), 2.0);
        assert_eq!(config.market_conditions.volatility, Level::High);
        assert_eq!(config.market_conditions.trend, Trend::Bull);
        assert_eq!(config.quote_token, "USDT");
        assert_eq!(config.risk_free_rate, 0.02);
    }

    #[test]
    fn nonsensical_values_are_rejected() {
        let bad_capital = SimulationConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_capital.validate(),
            Err(ConfigError::NonPositiveCapital(_))
        ));

        let mut empty = SimulationConfig::default();
        empty.period_end = empty.period_start;
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyPeriod { .. })));

        let gas = SimulationConfig {
            gas_cost_per_tx: -1.0,
            ..Default::default()
        };
        assert!(matches!(gas.validate(), Err(ConfigError::NegativeGas(_))));

        let workers = SimulationConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(matches!(workers.validate(), Err(ConfigError::ZeroWorkers)));
    }

    #[test]
    fn oversized_time_budget_is_rejected() {
        let config = SimulationConfig {
            max_duration_secs: Some(1e20),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "max_duration_secs",
                ..
            })
        ));
        assert_eq!(config.engine_config(1.0).max_duration, None);

        let from_toml = SimulationConfig::from_toml_str("max_duration_secs = 1e20");
        assert!(from_toml.is_err());
    }

    #[test]
    fn with_hours_replaces_the_period() {
        let config = SimulationConfig::default().with_hours(48).unwrap();
        assert_eq!(config.period_days(), 2.0);
    }

    #[test]
    fn with_hours_past_the_calendar_is_an_error() {
        let err = SimulationConfig::default().with_hours(u32::MAX).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "period_end", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SimulationConfig::from_toml_str("initial_capital = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn combined_file_reads_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blockflow.toml");
        std::fs::write(
            &path,
            r#"
            [simulation]
            seed = 7
            mode = "historical"
            alignment = "strict"

            [validator]
            strict = true
            token_whitelist = ["TON", "USDT"]
            "#,
        )
        .unwrap();
        let config = BlockflowConfig::from_file(&path).unwrap();
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.mode, PriceMode::Historical);
        assert_eq!(config.simulation.alignment, AlignmentPolicy::Strict);
        assert!(config.validator.strict);
        assert!(config.validator.token_allowed("ton"));
        assert!(!config.validator.token_allowed("BTC"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimulationConfig::from_file("/nonexistent/blockflow.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/blockflow.toml"));
    }

    #[test]
    fn engine_config_carries_settings() {
        let mut config = SimulationConfig::default();
        config.initial_prices.insert("TON".into(), 6.0);
        let engine = config.engine_config(0.3);
        assert_eq!(engine.initial_capital, 10_000.0);
        assert_eq!(engine.slippage_multiplier, 0.3);
        assert_eq!(engine.fallback_prices.get("TON"), Some(&6.0));
        assert_eq!(engine.max_duration, Some(Duration::from_secs(30)));
    }
}
