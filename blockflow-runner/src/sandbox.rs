//! Sandbox — validation plus a short synthetic dry run.

use serde::{Deserialize, Serialize};
use tracing::info;

use blockflow_core::domain::Strategy;
use blockflow_core::engine::SimulationPlan;
use blockflow_core::validator::{GraphValidator, ValidationResult};

use crate::config::SimulationConfig;
use crate::runner::{BacktestResult, PriceSource, SimError, Simulator};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxReport {
    /// Valid graph, no early termination and positive final equity.
    pub passed: bool,
    pub hours: u32,
    pub validation: ValidationResult,
    pub backtest: BacktestResult,
    /// Human-readable reasons for a failed run.
    pub issues: Vec<String>,
}

impl Simulator {
    /// Validate `strategy`, then run it for `config.sandbox_hours` on
    /// synthetic prices under the configured regime.
    pub fn run_sandbox(
        &self,
        strategy: &Strategy,
        config: &SimulationConfig,
    ) -> Result<SandboxReport, SimError> {
        let hours = config.sandbox_hours.max(1);
        let config = config.with_hours(hours)?;
        config.validate()?;

        let validation =
            GraphValidator::new(self.catalog().clone(), self.validator_config().clone())
                .validate(strategy);
        let plan = SimulationPlan::from_strategy(strategy);
        let backtest = self.execute(
            strategy,
            &plan,
            &config,
            PriceSource::Synthetic(config.market_conditions),
            0,
            None,
        )?;

        let mut issues = Vec::new();
        if !validation.valid {
            if rejected_by_strict_mode(&validation, self.validator_config().strict) {
                issues.push(format!(
                    "strict mode rejects {} warning(s)",
                    validation.warnings.len()
                ));
            } else {
                issues.push(format!(
                    "validation failed with {} error(s)",
                    validation.errors.len()
                ));
            }
        }
        if let Some(reason) = backtest.terminated {
            issues.push(format!("run terminated early: {reason:?}"));
        }
        if backtest.final_equity <= 0.0 {
            issues.push(format!("final equity {:.2} is not positive", backtest.final_equity));
        }

        let passed = issues.is_empty();
        info!(strategy = %strategy.id, passed, hours, "sandbox run finished");
        Ok(SandboxReport {
            passed,
            hours,
            validation,
            backtest,
            issues,
        })
    }
}

fn rejected_by_strict_mode(validation: &ValidationResult, strict: bool) -> bool {
    strict && validation.errors.is_empty() && !validation.warnings.is_empty()
}
