//! Performance estimate — one baseline backtest plus a 50-run Monte Carlo.

use serde::{Deserialize, Serialize};
use tracing::info;

use blockflow_core::domain::Strategy;

use crate::config::SimulationConfig;
use crate::metrics::PerformanceMetrics;
use crate::runner::{SimError, Simulator};

/// Number of Monte Carlo runs behind every estimate.
pub const ESTIMATE_RUNS: usize = 50;

/// Upper bound of the confidence score.
pub const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEstimate {
    pub horizon_days: u32,
    /// Monte Carlo median return, percent.
    pub expected_return: f64,
    /// Monte Carlo 95th percentile return.
    pub best_case: f64,
    /// Monte Carlo 5th percentile return.
    pub worst_case: f64,
    pub baseline: PerformanceMetrics,
    /// Heuristic in `[0, 0.95]`.
    pub confidence: f64,
}

/// Weighted checklist over the baseline metrics and the Monte Carlo spread.
pub fn confidence_score(baseline: &PerformanceMetrics, mc_return_range: f64) -> f64 {
    let checks = [
        (baseline.sharpe_ratio > 1.0, 0.15),
        (baseline.sharpe_ratio > 2.0, 0.10),
        (baseline.win_rate > 0.5, 0.15),
        (baseline.win_rate > 0.6, 0.10),
        (baseline.max_drawdown < 20.0, 0.15),
        (baseline.max_drawdown < 10.0, 0.10),
        (mc_return_range < 50.0, 0.20),
    ];
    checks
        .iter()
        .filter(|(passed, _)| *passed)
        .map(|(_, weight)| weight)
        .sum::<f64>()
        .clamp(0.0, MAX_CONFIDENCE)
}

impl Simulator {
    /// Estimate returns over the next `horizon_days`, starting at the
    /// configured period start.
    pub fn estimate_performance(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
        horizon_days: u32,
    ) -> Result<PerformanceEstimate, SimError> {
        let config = config.with_hours(horizon_days.saturating_mul(24))?;
        let baseline = self.run_backtest(strategy, &config)?;
        let mc = self.run_monte_carlo(strategy, &config, ESTIMATE_RUNS)?;

        let confidence = confidence_score(&baseline.metrics, mc.return_range());
        info!(strategy = %strategy.id, horizon_days, confidence, "performance estimate ready");

        Ok(PerformanceEstimate {
            horizon_days,
            expected_return: mc.median_return,
            best_case: mc.percentile95_return,
            worst_case: mc.percentile5_return,
            baseline: baseline.metrics,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(sharpe: f64, win_rate: f64, max_drawdown: f64) -> PerformanceMetrics {
        let mut m = PerformanceMetrics::compute(&[], &[], 100.0, 1.0, 0.0);
        m.sharpe_ratio = sharpe;
        m.win_rate = win_rate;
        m.max_drawdown = max_drawdown;
        m
    }

    #[test]
    fn perfect_checklist_is_capped() {
        assert_eq!(confidence_score(&metrics(3.0, 0.7, 5.0), 10.0), MAX_CONFIDENCE);
    }

    #[test]
    fn failing_checklist_is_zero() {
        assert_eq!(confidence_score(&metrics(0.5, 0.4, 30.0), 80.0), 0.0);
    }

    #[test]
    fn partial_checklist_sums_weights() {
        let c = confidence_score(&metrics(1.5, 0.55, 15.0), 60.0);
        assert!((c - 0.45).abs() < 1e-12);
    }
}
