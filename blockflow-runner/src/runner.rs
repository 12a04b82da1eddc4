//! Backtest runner — the `Simulator` façade over the core engine.
//!
//! Resolves the simulation plan, builds the price series (synthetic walk or
//! provider history), runs the tick loop and computes metrics. Monte Carlo,
//! sandbox and performance estimates are built on `Simulator::execute`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use blockflow_core::catalog::BlockCatalog;
use blockflow_core::data::{
    hourly_timestamps, merge_series, DataError, MarketConditions, PriceDataProvider, PriceSeries,
    SyntheticMarket,
};
use blockflow_core::domain::{Strategy, StrategyId};
use blockflow_core::engine::{
    run_simulation, DrawdownPoint, EquityPoint, SimulationPlan, TerminationReason, Trade,
};
use blockflow_core::rng::{price_stream, RngHierarchy, EXECUTION_STREAM};
use blockflow_core::validator::ValidatorConfig;

use crate::cache::{BacktestCache, CacheKey};
use crate::config::{ConfigError, PriceMode, SimulationConfig};
use crate::metrics::PerformanceMetrics;

/// Errors that prevent a simulation from starting. The tick loop itself never fails.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("Monte Carlo needs at least one run")]
    NoRuns,
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Current schema version for BacktestResult serialization.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy_id: StrategyId,
    pub strategy_version: u32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub initial_capital: f64,
    pub final_equity: f64,
    /// Regime of a synthetic run; `None` for historical prices.
    pub market_conditions: Option<MarketConditions>,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub trigger_firings: usize,
    pub gas_spent: f64,
    /// Set when the loop stopped before the last tick.
    #[serde(default)]
    pub terminated: Option<TerminationReason>,
    /// Tokens priced from fallbacks at least once.
    #[serde(default)]
    pub fallback_tokens: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where one run takes its prices from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PriceSource {
    /// Whatever the config's `mode` says.
    Configured,
    /// A synthetic walk under the given regime, regardless of `mode`.
    Synthetic(MarketConditions),
}

/// Entry point for every simulation. Cheap to clone; clones share the
/// catalog, provider and cache.
#[derive(Clone)]
pub struct Simulator {
    catalog: Arc<BlockCatalog>,
    provider: Option<Arc<dyn PriceDataProvider>>,
    cache: Option<BacktestCache>,
    validator_config: ValidatorConfig,
}

impl Simulator {
    pub fn new(catalog: Arc<BlockCatalog>) -> Self {
        Self {
            catalog,
            provider: None,
            cache: None,
            validator_config: ValidatorConfig::default(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn PriceDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_cache(mut self, cache: BacktestCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Settings used by the sandbox's validation step.
    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    pub fn catalog(&self) -> &Arc<BlockCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> Option<&BacktestCache> {
        self.cache.as_ref()
    }

    pub fn validator_config(&self) -> &ValidatorConfig {
        &self.validator_config
    }

    /// Run one backtest over the configured period.
    pub fn run_backtest(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
    ) -> Result<BacktestResult, SimError> {
        self.run_backtest_with_cancel(strategy, config, None)
    }

    /// Like [`Simulator::run_backtest`], stopping early once `cancel` is set.
    pub fn run_backtest_with_cancel(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestResult, SimError> {
        config.validate()?;

        let key = CacheKey::new(strategy, config.period_start, config.period_end);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            info!(strategy = %strategy.id, "backtest served from cache");
            return Ok((*hit).clone());
        }

        info!(
            strategy = %strategy.id,
            version = strategy.version,
            start = %config.period_start,
            end = %config.period_end,
            mode = ?config.mode,
            "starting backtest"
        );
        let plan = SimulationPlan::from_strategy(strategy);
        let result = self.execute(strategy, &plan, config, PriceSource::Configured, 0, cancel)?;
        info!(
            strategy = %strategy.id,
            trades = result.trades.len(),
            total_return = result.metrics.total_return,
            max_drawdown = result.metrics.max_drawdown,
            "backtest finished"
        );

        if let Some(cache) = &self.cache {
            if result.terminated.is_none() {
                cache.insert(key, Arc::new(result.clone()));
            }
        }
        Ok(result)
    }

    /// One run of the tick loop. `run` selects the RNG streams, so equal
    /// `(seed, strategy, run)` triples reproduce the same result.
    pub(crate) fn execute(
        &self,
        strategy: &Strategy,
        plan: &SimulationPlan,
        config: &SimulationConfig,
        source: PriceSource,
        run: u64,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestResult, SimError> {
        let rngs = RngHierarchy::new(config.seed);
        let (series, conditions) = self.price_series(strategy, plan, config, source, run, &rngs)?;

        let liquidity = conditions.unwrap_or(config.market_conditions).liquidity;
        let engine = config.engine_config(config.regimes.slippage_multiplier.get(liquidity));
        let mut rng = rngs.rng_for(&strategy.id, EXECUTION_STREAM, run);
        let outcome = run_simulation(plan, &series, &engine, &mut rng, cancel);

        if let Some(reason) = outcome.terminated {
            warn!(strategy = %strategy.id, ?reason, ticks = outcome.equity_curve.len(), "backtest terminated early");
        }

        let metrics = PerformanceMetrics::compute(
            &outcome.equity_curve,
            &outcome.trades,
            config.initial_capital,
            config.period_days(),
            config.risk_free_rate,
        );
        let final_equity = outcome
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(config.initial_capital);

        Ok(BacktestResult {
            schema_version: SCHEMA_VERSION,
            strategy_id: strategy.id.clone(),
            strategy_version: strategy.version,
            period_start: config.period_start,
            period_end: config.period_end,
            initial_capital: config.initial_capital,
            final_equity,
            market_conditions: conditions,
            metrics,
            trades: outcome.trades,
            equity_curve: outcome.equity_curve,
            drawdown_curve: outcome.drawdown_curve,
            trigger_firings: outcome.trigger_firings,
            gas_spent: outcome.gas_spent,
            terminated: outcome.terminated,
            fallback_tokens: outcome.fallback_tokens,
        })
    }

    fn price_series(
        &self,
        strategy: &Strategy,
        plan: &SimulationPlan,
        config: &SimulationConfig,
        source: PriceSource,
        run: u64,
        rngs: &RngHierarchy,
    ) -> Result<(PriceSeries, Option<MarketConditions>), SimError> {
        let tokens: Vec<String> = plan
            .tokens()
            .into_iter()
            .filter(|t| *t != config.quote_token)
            .collect();

        let conditions = match source {
            PriceSource::Synthetic(c) => c,
            PriceSource::Configured => match (config.mode, &self.provider) {
                (PriceMode::Historical, Some(provider)) => {
                    let series = self.historical_series(provider.as_ref(), &tokens, config)?;
                    return Ok((series, None));
                }
                (PriceMode::Historical, None) => {
                    warn!(
                        strategy = %strategy.id,
                        "historical mode without a price provider, using synthetic prices"
                    );
                    config.market_conditions
                }
                (PriceMode::Synthetic, _) => config.market_conditions,
            },
        };

        let market = SyntheticMarket::new(conditions, &config.regimes);
        let series = market.series(
            &tokens,
            hourly_timestamps(config.period_start, config.period_end),
            &config.initial_prices,
            |token| rngs.rng_for(&strategy.id, &price_stream(token), run),
        );
        Ok((series, Some(conditions)))
    }

    /// Fetch each token in turn. A failed or empty fetch leaves the token to
    /// the engine's fallback price.
    fn historical_series(
        &self,
        provider: &dyn PriceDataProvider,
        tokens: &[String],
        config: &SimulationConfig,
    ) -> Result<PriceSeries, SimError> {
        let mut histories = Vec::with_capacity(tokens.len());
        for token in tokens {
            match provider.get_historical_prices(token, config.period_start, config.period_end) {
                Ok(points) if !points.is_empty() => histories.push((token.clone(), points)),
                Ok(_) => {
                    warn!(token = %token, provider = provider.name(), "empty price history, using fallback price")
                }
                Err(e) => {
                    warn!(token = %token, provider = provider.name(), error = %e, "price fetch failed, using fallback price")
                }
            }
        }

        let series = merge_series(histories, config.alignment)?;
        if series.is_empty() {
            return Ok(PriceSeries::new(hourly_timestamps(
                config.period_start,
                config.period_end,
            )));
        }
        Ok(series)
    }
}
