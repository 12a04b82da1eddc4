//! Graph validator — independent static-analysis passes over a strategy.
//!
//! Passes run in a fixed order: structural, connections, block config, risk.
//! Gas and the security checklist are computed last from the same graph.
//! Every pass terminates in time bounded by block and connection counts.

pub mod address;
mod block_config;
mod config;
mod connections;
pub mod gas;
mod result;
pub mod risk;
pub mod security;
mod structural;

use std::sync::Arc;

use tracing::debug;

use crate::catalog::BlockCatalog;
use crate::domain::Strategy;

pub use config::{ValidatorConfig, CONDITION_OPERATORS, DEFAULT_PROTOCOLS, DEFAULT_TOKENS};
pub use result::{SecurityCheck, Severity, ValidationCode, ValidationError, ValidationResult};

use result::Findings;

#[derive(Debug, Clone)]
pub struct GraphValidator {
    catalog: Arc<BlockCatalog>,
    config: ValidatorConfig,
}

impl GraphValidator {
    pub fn new(catalog: Arc<BlockCatalog>, config: ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run every pass. Pure: no state is kept between calls.
    pub fn validate(&self, strategy: &Strategy) -> ValidationResult {
        let mut findings = Findings::default();

        let cycle = structural::check(strategy, &mut findings);
        debug!(strategy = %strategy.id, findings = findings.len(), "structural pass");

        connections::check(strategy, &mut findings);
        debug!(strategy = %strategy.id, findings = findings.len(), "connection pass");

        block_config::check(strategy, &self.catalog, &self.config, &mut findings);
        debug!(strategy = %strategy.id, findings = findings.len(), "block config pass");

        let risk_score = risk::score(strategy, &mut findings);
        let gas_estimate = gas::estimate(strategy);
        let security_checks = security::checklist(strategy, &self.config, cycle.is_none());

        let valid = findings.errors.is_empty() && !(self.config.strict && !findings.warnings.is_empty());
        debug!(
            strategy = %strategy.id,
            valid,
            errors = findings.errors.len(),
            warnings = findings.warnings.len(),
            risk_score,
            gas_estimate,
            "validation finished"
        );

        ValidationResult {
            valid,
            errors: findings.errors,
            warnings: findings.warnings,
            info: findings.info,
            risk_score,
            gas_estimate,
            security_checks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connection, Position, StrategyCategory};

    fn validator(config: ValidatorConfig) -> GraphValidator {
        GraphValidator::new(Arc::new(BlockCatalog::with_defaults()), config)
    }

    fn simple() -> Strategy {
        let catalog = BlockCatalog::with_defaults();
        let mut s = Strategy::new("s", "DCA", StrategyCategory::PortfolioAutomation)
            .with_block(
                catalog
                    .create_block("schedule_trigger", "t", Position::default())
                    .unwrap(),
            )
            .with_block(catalog.create_block("swap", "x", Position::default()).unwrap())
            .with_connection(Connection::new("e1", ("t", "trigger"), ("x", "execute")));
        s.risk_params.stop_loss_percent = 5.0;
        s
    }

    #[test]
    fn simple_strategy_is_valid() {
        let result = validator(ValidatorConfig::default()).validate(&simple());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.gas_estimate, gas::SWAP_GAS);
        assert_eq!(result.security_checks.len(), security::CHECK_NAMES.len());
        assert!(result.has_code(ValidationCode::NoRiskControls));
    }

    #[test]
    fn strict_mode_rejects_warnings() {
        let mut s = simple();
        s.blocks[1]
            .config
            .insert("toToken".into(), serde_json::json!("SHIB"));
        let lenient = validator(ValidatorConfig::default()).validate(&s);
        let strict = validator(ValidatorConfig::default().strict()).validate(&s);
        assert!(lenient.valid);
        assert!(!strict.valid);
        assert_eq!(lenient.warnings, strict.warnings);
    }

    #[test]
    fn validation_is_repeatable() {
        let v = validator(ValidatorConfig::default());
        let s = simple();
        assert_eq!(v.validate(&s), v.validate(&s));
    }
}
