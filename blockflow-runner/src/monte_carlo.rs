//! Monte Carlo — backtests under independently resampled market regimes.
//!
//! Every run draws its regime from its own `(seed, strategy, run)` RNG stream
//! and is forced into synthetic prices. Runs execute on a private bounded
//! rayon pool; results are collected in run order, so the aggregate does not
//! depend on the worker count.

use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use blockflow_core::data::MarketConditions;
use blockflow_core::domain::Strategy;
use blockflow_core::engine::{SimulationPlan, TerminationReason};
use blockflow_core::rng::{RngHierarchy, MARKET_STREAM};

use crate::config::SimulationConfig;
use crate::runner::{PriceSource, SimError, Simulator};

/// Summary of one Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McRun {
    pub run: u64,
    pub market_conditions: MarketConditions,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub total_trades: usize,
    #[serde(default)]
    pub terminated: Option<TerminationReason>,
}

/// Aggregate over all runs. Returns and drawdowns are in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub runs: usize,
    pub median_return: f64,
    pub mean_return: f64,
    pub percentile5_return: f64,
    pub percentile95_return: f64,
    pub median_drawdown: f64,
    pub max_drawdown: f64,
    pub mean_sharpe: f64,
    pub samples: Vec<McRun>,
}

impl MonteCarloResult {
    fn aggregate(samples: Vec<McRun>) -> Self {
        let returns = sorted(samples.iter().map(|s| s.total_return));
        let drawdowns = sorted(samples.iter().map(|s| s.max_drawdown));
        let n = samples.len();
        Self {
            runs: n,
            median_return: middle(&returns),
            mean_return: returns.iter().sum::<f64>() / n as f64,
            percentile5_return: percentile_sorted(&returns, 0.05),
            percentile95_return: percentile_sorted(&returns, 0.95),
            median_drawdown: middle(&drawdowns),
            max_drawdown: drawdowns.last().copied().unwrap_or(0.0),
            mean_sharpe: samples.iter().map(|s| s.sharpe_ratio).sum::<f64>() / n as f64,
            samples,
        }
    }

    /// Spread between the 95th and 5th percentile return, in points.
    pub fn return_range(&self) -> f64 {
        self.percentile95_return - self.percentile5_return
    }
}

impl Simulator {
    /// Run `runs` independent backtests under sampled market conditions.
    pub fn run_monte_carlo(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
        runs: usize,
    ) -> Result<MonteCarloResult, SimError> {
        self.run_monte_carlo_with_cancel(strategy, config, runs, None)
    }

    pub fn run_monte_carlo_with_cancel(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
        runs: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<MonteCarloResult, SimError> {
        if runs == 0 {
            return Err(SimError::NoRuns);
        }
        config.validate()?;

        info!(strategy = %strategy.id, runs, workers = config.max_workers, "starting Monte Carlo");
        let plan = SimulationPlan::from_strategy(strategy);
        let rngs = RngHierarchy::new(config.seed);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_workers)
            .build()?;

        let samples = pool.install(|| {
            (0..runs as u64)
                .into_par_iter()
                .map(|run| {
                    let mut rng = rngs.rng_for(&strategy.id, MARKET_STREAM, run);
                    let conditions = MarketConditions::sample(&mut rng);
                    let result = self.execute(
                        strategy,
                        &plan,
                        config,
                        PriceSource::Synthetic(conditions),
                        run,
                        cancel,
                    )?;
                    Ok(McRun {
                        run,
                        market_conditions: conditions,
                        total_return: result.metrics.total_return,
                        max_drawdown: result.metrics.max_drawdown,
                        sharpe_ratio: result.metrics.sharpe_ratio,
                        total_trades: result.metrics.total_trades,
                        terminated: result.terminated,
                    })
                })
                .collect::<Result<Vec<_>, SimError>>()
        })?;

        let result = MonteCarloResult::aggregate(samples);
        info!(
            strategy = %strategy.id,
            runs = result.runs,
            median_return = result.median_return,
            p5 = result.percentile5_return,
            p95 = result.percentile95_return,
            "Monte Carlo finished"
        );
        Ok(result)
    }
}

// ─── Order statistics ───────────────────────────────────────────────

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

fn middle(sorted: &[f64]) -> f64 {
    sorted.get(sorted.len() / 2).copied().unwrap_or(0.0)
}

/// Discrete percentile: element at `floor(N * p)`, no interpolation.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}
