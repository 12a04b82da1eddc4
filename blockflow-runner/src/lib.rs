//! BlockFlow Runner — backtest orchestration, Monte Carlo, metrics and export.
//!
//! This crate builds on `blockflow-core` to provide:
//! - TOML-loadable simulation configuration
//! - The `Simulator` façade: backtest, Monte Carlo, sandbox, performance estimate
//! - Performance metrics (returns, Sharpe, Sortino, drawdown, monthly returns)
//! - Bounded in-process result cache
//! - CSV-backed price provider for historical mode
//! - JSON and CSV export of results

pub mod cache;
pub mod config;
pub mod estimate;
pub mod export;
pub mod metrics;
pub mod monte_carlo;
pub mod price_csv;
pub mod runner;
pub mod sandbox;

pub use cache::{BacktestCache, CacheKey, DEFAULT_MAX_ENTRIES};
pub use config::{BlockflowConfig, ConfigError, PriceMode, SimulationConfig};
pub use estimate::{confidence_score, PerformanceEstimate, ESTIMATE_RUNS};
pub use export::{
    export_equity_csv, export_json, export_trades_csv, import_json, load_artifacts,
    save_artifacts,
};
pub use metrics::{MonthlyReturn, PerformanceMetrics};
pub use monte_carlo::{McRun, MonteCarloResult};
pub use price_csv::CsvPriceProvider;
pub use runner::{BacktestResult, SimError, Simulator, SCHEMA_VERSION};
pub use sandbox::SandboxReport;
