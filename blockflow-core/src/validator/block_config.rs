//! Per-block configuration checks.

use serde_json::Value;

use crate::catalog::BlockCatalog;
use crate::domain::{Block, BlockCategory, Strategy, TOKEN_CONFIG_KEYS};
use crate::engine::plan::DEFAULT_INTERVAL_SECS;

use super::config::{ValidatorConfig, CONDITION_OPERATORS};
use super::result::{Findings, ValidationCode, ValidationError};

const PROTOCOL_CONFIG_KEYS: [&str; 2] = ["protocol", "dex"];

pub(crate) fn check(
    strategy: &Strategy,
    catalog: &BlockCatalog,
    config: &ValidatorConfig,
    findings: &mut Findings,
) {
    for block in &strategy.blocks {
        if !catalog.contains(&block.block_type) {
            findings.push(
                ValidationError::warning(
                    ValidationCode::UnknownBlockType,
                    format!("block type '{}' is not registered", block.block_type),
                )
                .on_block(&block.id),
            );
        }

        match block.category {
            BlockCategory::Trigger => check_trigger(block, findings),
            BlockCategory::Condition => {
                check_whitelists(block, config, findings);
                check_operator(block, findings);
            }
            BlockCategory::Action => check_whitelists(block, config, findings),
            BlockCategory::Risk => check_risk_limits(block, findings),
            BlockCategory::Capital | BlockCategory::Utility => {}
        }
    }
}

fn check_trigger(block: &Block, findings: &mut Findings) {
    if block.block_type != "schedule_trigger" {
        return;
    }
    match block.config_f64("interval") {
        None => findings.push(
            ValidationError::error(
                ValidationCode::MissingInterval,
                format!("schedule trigger '{}' has no interval", block.name),
            )
            .on_block(&block.id)
            .on_field("interval"),
        ),
        Some(secs) if !(secs > 0.0) => findings.push(
            ValidationError::warning(
                ValidationCode::MissingInterval,
                format!(
                    "schedule trigger '{}' has non-positive interval {secs}, simulation uses {DEFAULT_INTERVAL_SECS}s",
                    block.name
                ),
            )
            .on_block(&block.id)
            .on_field("interval"),
        ),
        Some(_) => {}
    }
}

fn check_whitelists(block: &Block, config: &ValidatorConfig, findings: &mut Findings) {
    for key in TOKEN_CONFIG_KEYS {
        if let Some(token) = block.config_str(key) {
            if !token.is_empty() && !config.token_allowed(token) {
                findings.push(
                    ValidationError::warning(
                        ValidationCode::TokenNotWhitelisted,
                        format!("token '{token}' is not whitelisted"),
                    )
                    .on_block(&block.id)
                    .on_field(key),
                );
            }
        }
    }
    for key in PROTOCOL_CONFIG_KEYS {
        if let Some(protocol) = block.config_str(key) {
            if !protocol.is_empty() && !config.protocol_allowed(protocol) {
                findings.push(
                    ValidationError::warning(
                        ValidationCode::ProtocolNotWhitelisted,
                        format!("protocol '{protocol}' is not whitelisted"),
                    )
                    .on_block(&block.id)
                    .on_field(key),
                );
            }
        }
    }
}

fn check_operator(block: &Block, findings: &mut Findings) {
    let Some(op) = block.config.get("operator") else {
        return;
    };
    let ok = op
        .as_str()
        .map(|s| CONDITION_OPERATORS.contains(&s))
        .unwrap_or(false);
    if !ok {
        findings.push(
            ValidationError::error(
                ValidationCode::InvalidOperator,
                format!("unsupported comparison operator {op}"),
            )
            .on_block(&block.id)
            .on_field("operator"),
        );
    }
}

fn check_risk_limits(block: &Block, findings: &mut Findings) {
    for (key, value) in &block.config {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(n) = number {
            if n <= 0.0 || !n.is_finite() {
                findings.push(
                    ValidationError::error(
                        ValidationCode::InvalidRiskLimit,
                        format!("risk limit '{key}' must be positive, got {n}"),
                    )
                    .on_block(&block.id)
                    .on_field(key),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, StrategyCategory};
    use serde_json::json;

    fn run(blocks: Vec<Block>) -> Findings {
        let catalog = BlockCatalog::with_defaults();
        let mut s = Strategy::new("s", "S", StrategyCategory::Trading);
        s.blocks = blocks;
        let mut f = Findings::default();
        check(&s, &catalog, &ValidatorConfig::default(), &mut f);
        f
    }

    fn make(ty: &str, id: &str) -> Block {
        BlockCatalog::with_defaults()
            .create_block(ty, id, Position::default())
            .unwrap()
    }

    #[test]
    fn defaults_are_clean() {
        let f = run(vec![
            make("schedule_trigger", "t"),
            make("price_condition", "c"),
            make("swap", "x"),
            make("stake", "k"),
            make("stop_loss", "r"),
        ]);
        assert_eq!(f.len(), 0, "{:?}", f.errors);
    }

    #[test]
    fn schedule_without_interval() {
        let mut t = make("schedule_trigger", "t");
        t.config.remove("interval");
        let f = run(vec![t]);
        assert_eq!(f.count(ValidationCode::MissingInterval), 1);
    }

    #[test]
    fn non_positive_interval_is_a_warning() {
        let mut t = make("schedule_trigger", "t");
        t.config.insert("interval".into(), json!(0));
        let f = run(vec![t]);
        assert!(f.errors.is_empty());
        assert_eq!(f.warnings.len(), 1);
        assert_eq!(f.warnings[0].code, ValidationCode::MissingInterval);
        assert!(f.warnings[0].message.contains("3600"));
    }

    #[test]
    fn only_the_schedule_type_needs_an_interval() {
        let mut t = make("signal_trigger", "t");
        t.block_type = "reschedule_signal".into();
        t.config.remove("interval");
        let f = run(vec![t]);
        assert_eq!(f.count(ValidationCode::MissingInterval), 0);
    }

    #[test]
    fn non_whitelisted_token_and_protocol_warn() {
        let mut x = make("swap", "x");
        x.config.insert("toToken".into(), json!("SCAM"));
        x.config.insert("dex".into(), json!("rugswap"));
        let f = run(vec![x]);
        assert!(f.errors.is_empty());
        assert_eq!(f.count(ValidationCode::TokenNotWhitelisted), 1);
        assert_eq!(f.count(ValidationCode::ProtocolNotWhitelisted), 1);
    }

    #[test]
    fn non_positive_risk_limit() {
        let mut r = make("stop_loss", "r");
        r.config.insert("percentage".into(), json!(0));
        let mut p = make("position_limit", "p");
        p.config.insert("maxPercent".into(), json!("-3"));
        let f = run(vec![r, p]);
        assert_eq!(f.count(ValidationCode::InvalidRiskLimit), 2);
    }

    #[test]
    fn unknown_operator() {
        let mut c = make("price_condition", "c");
        c.config.insert("operator".into(), json!("=>"));
        let f = run(vec![c]);
        assert_eq!(f.count(ValidationCode::InvalidOperator), 1);
    }

    #[test]
    fn unregistered_type_is_flagged_not_rejected() {
        let mut b = make("swap", "x");
        b.block_type = "flash_loan".into();
        let f = run(vec![b]);
        assert!(f.errors.is_empty());
        assert_eq!(f.count(ValidationCode::UnknownBlockType), 1);
    }
}
