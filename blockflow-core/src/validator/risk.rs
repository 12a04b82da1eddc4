//! Risk scoring.
//!
//! Each risk parameter contributes in proportion to how far it exceeds its
//! safe threshold, capped per parameter. Every exceeded threshold also emits
//! a `risk_exceeded` warning, and each such finding adds a flat penalty. All
//! contributions are non-decreasing in their parameter.

use crate::domain::{BlockCategory, Strategy, StrategyCategory};

use super::result::{Findings, ValidationCode, ValidationError};

const POSITION_SAFE: f64 = 30.0;
const DAILY_LOSS_SAFE: f64 = 5.0;
const DRAWDOWN_SAFE: f64 = 15.0;
const SLIPPAGE_SAFE: f64 = 2.0;
const NO_STOP_LOSS_PENALTY: f64 = 15.0;
const PER_FINDING_PENALTY: f64 = 5.0;

pub fn category_offset(category: StrategyCategory) -> f64 {
    match category {
        StrategyCategory::Arbitrage => 15.0,
        StrategyCategory::Trading | StrategyCategory::LiquidityManagement => 10.0,
        StrategyCategory::YieldFarming | StrategyCategory::Custom => 5.0,
        StrategyCategory::PortfolioAutomation => 0.0,
    }
}

/// A stop loss counts as configured via the risk parameter or a `stop_loss` block.
pub fn has_stop_loss(strategy: &Strategy) -> bool {
    strategy.risk_params.stop_loss_percent > 0.0
        || strategy.blocks.iter().any(|b| b.block_type == "stop_loss")
}

fn exceeded(findings: &mut Findings, field: &str, message: String) {
    findings.push(ValidationError::warning(ValidationCode::RiskExceeded, message).on_field(field));
}

pub(crate) fn score(strategy: &Strategy, findings: &mut Findings) -> u32 {
    let p = &strategy.risk_params;
    let mut score = category_offset(strategy.category);

    if p.max_position_size > POSITION_SAFE {
        score += ((p.max_position_size - POSITION_SAFE) * 0.5).min(25.0);
        exceeded(
            findings,
            "maxPositionSize",
            format!(
                "max position size {}% exceeds {}%",
                p.max_position_size, POSITION_SAFE
            ),
        );
    }
    if p.max_daily_loss > DAILY_LOSS_SAFE {
        score += ((p.max_daily_loss - DAILY_LOSS_SAFE) * 2.0).min(20.0);
        exceeded(
            findings,
            "maxDailyLoss",
            format!("max daily loss {}% exceeds {}%", p.max_daily_loss, DAILY_LOSS_SAFE),
        );
    }
    if p.max_drawdown > DRAWDOWN_SAFE {
        score += (p.max_drawdown - DRAWDOWN_SAFE).min(20.0);
        exceeded(
            findings,
            "maxDrawdown",
            format!("max drawdown {}% exceeds {}%", p.max_drawdown, DRAWDOWN_SAFE),
        );
    }
    if !has_stop_loss(strategy) {
        score += NO_STOP_LOSS_PENALTY;
        exceeded(
            findings,
            "stopLossPercent",
            "no stop loss configured".to_string(),
        );
    }
    if p.max_slippage > SLIPPAGE_SAFE {
        score += ((p.max_slippage - SLIPPAGE_SAFE) * 5.0).min(15.0);
        exceeded(
            findings,
            "maxSlippage",
            format!("max slippage {}% exceeds {}%", p.max_slippage, SLIPPAGE_SAFE),
        );
    }

    if strategy.blocks_of(BlockCategory::Risk).next().is_none() {
        findings.push(ValidationError::info(
            ValidationCode::NoRiskControls,
            "strategy has no risk-control blocks",
        ));
    }

    score += findings.count(ValidationCode::RiskExceeded) as f64 * PER_FINDING_PENALTY;
    score.round().clamp(0.0, 100.0) as u32
}
