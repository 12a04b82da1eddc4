//! Fixed, ordered security checklist.

use crate::domain::{BlockCategory, Strategy};

use super::address::value_contains_address;
use super::config::ValidatorConfig;
use super::result::SecurityCheck;
use super::risk::has_stop_loss;

pub const MAX_SAFE_POSITION: f64 = 50.0;

/// Check names, in report order.
pub const CHECK_NAMES: [&str; 7] = [
    "no_hardcoded_addresses",
    "has_risk_controls",
    "position_size_limit",
    "stop_loss_configured",
    "notifications_enabled",
    "whitelisted_assets",
    "acyclic_graph",
];

fn check(name: &str, passed: bool, ok: &str, failed: String) -> SecurityCheck {
    SecurityCheck {
        name: name.to_string(),
        passed,
        message: if passed { ok.to_string() } else { failed },
    }
}

pub(crate) fn checklist(
    strategy: &Strategy,
    config: &ValidatorConfig,
    acyclic: bool,
) -> Vec<SecurityCheck> {
    let with_address: Vec<&str> = strategy
        .blocks
        .iter()
        .filter(|b| b.config.values().any(value_contains_address))
        .map(|b| b.id.as_str())
        .collect();

    let risk_blocks = strategy.blocks_of(BlockCategory::Risk).count();
    let position = strategy.risk_params.max_position_size;

    let bad_tokens: Vec<String> = strategy
        .referenced_tokens()
        .into_iter()
        .filter(|t| !config.token_allowed(t))
        .collect();
    let bad_protocols: Vec<&str> = strategy
        .blocks
        .iter()
        .flat_map(|b| ["protocol", "dex"].into_iter().filter_map(move |k| b.config_str(k)))
        .filter(|p| !p.is_empty() && !config.protocol_allowed(p))
        .collect();
    let whitelisted = bad_tokens.is_empty() && bad_protocols.is_empty();

    vec![
        check(
            CHECK_NAMES[0],
            with_address.is_empty(),
            "no address literals in block configuration",
            format!("address literal found in block(s): {}", with_address.join(", ")),
        ),
        check(
            CHECK_NAMES[1],
            risk_blocks > 0,
            "risk-control blocks present",
            "no risk-control blocks".to_string(),
        ),
        check(
            CHECK_NAMES[2],
            position <= MAX_SAFE_POSITION,
            "position size within limit",
            format!("max position size {position}% exceeds {MAX_SAFE_POSITION}%"),
        ),
        check(
            CHECK_NAMES[3],
            has_stop_loss(strategy),
            "stop loss configured",
            "no stop loss configured".to_string(),
        ),
        check(
            CHECK_NAMES[4],
            strategy.config.notifications_enabled,
            "notifications enabled",
            "notifications disabled".to_string(),
        ),
        check(
            CHECK_NAMES[5],
            whitelisted,
            "all tokens and protocols whitelisted",
            format!(
                "not whitelisted: {}",
                bad_tokens
                    .iter()
                    .map(String::as_str)
                    .chain(bad_protocols.iter().copied())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
        check(
            CHECK_NAMES[6],
            acyclic,
            "graph is acyclic",
            "graph contains a cycle".to_string(),
        ),
    ]
}
