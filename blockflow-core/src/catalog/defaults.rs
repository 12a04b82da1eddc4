//! Built-in block type definitions.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::{BlockTypeDefinition, ConfigField, ConfigFieldKind};
use crate::domain::{BlockCategory, DataType, Port};

fn defaults(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

fn select(options: &[&str]) -> ConfigFieldKind {
    ConfigFieldKind::Select(options.iter().map(|s| s.to_string()).collect())
}

fn amount_type() -> ConfigFieldKind {
    select(&["percentage", "fixed", "all"])
}

fn operator() -> ConfigFieldKind {
    select(&[">", "<", ">=", "<=", "==", "!=", "crosses_above", "crosses_below"])
}

struct Def {
    block_type: &'static str,
    category: BlockCategory,
    name: &'static str,
    description: &'static str,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    schema: Vec<ConfigField>,
    config: Value,
}

impl From<Def> for BlockTypeDefinition {
    fn from(d: Def) -> Self {
        BlockTypeDefinition {
            block_type: d.block_type.to_string(),
            category: d.category,
            name: d.name.to_string(),
            description: d.description.to_string(),
            inputs: d.inputs,
            outputs: d.outputs,
            config_schema: d.schema,
            default_config: defaults(d.config),
        }
    }
}

fn trigger_out() -> Vec<Port> {
    vec![Port::new("trigger", DataType::Trigger, false)]
}

fn gate_in() -> Vec<Port> {
    vec![Port::new("in", DataType::Boolean, true)]
}

fn gate_out() -> Vec<Port> {
    vec![Port::new("out", DataType::Boolean, false)]
}

fn execute_in() -> Port {
    Port::new("execute", DataType::Boolean, true)
}

fn result_out() -> Vec<Port> {
    vec![Port::new("result", DataType::Boolean, false)]
}

pub(super) fn builtin_definitions() -> Vec<BlockTypeDefinition> {
    use BlockCategory::*;
    use ConfigFieldKind::{Number, Text, Token};

    let defs = vec![
        // ── Triggers ──
        Def {
            block_type: "schedule_trigger",
            category: Trigger,
            name: "Schedule",
            description: "Fires every `interval` seconds",
            inputs: vec![],
            outputs: trigger_out(),
            schema: vec![ConfigField::new("interval", Number, true)],
            config: json!({ "interval": 3600 }),
        },
        Def {
            block_type: "price_trigger",
            category: Trigger,
            name: "Price Threshold",
            description: "Fires when a token price crosses a threshold",
            inputs: vec![],
            outputs: trigger_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("threshold", Number, true),
                ConfigField::new("direction", select(&["above", "below"]), true),
            ],
            config: json!({ "token": "TON", "threshold": 5, "direction": "above" }),
        },
        Def {
            block_type: "signal_trigger",
            category: Trigger,
            name: "External Signal",
            description: "Fires on an external webhook or bot signal",
            inputs: vec![],
            outputs: trigger_out(),
            schema: vec![ConfigField::new("source", Text, true)],
            config: json!({ "source": "webhook" }),
        },
        // ── Conditions ──
        Def {
            block_type: "price_condition",
            category: Condition,
            name: "Price Condition",
            description: "Passes when a token price satisfies the comparison",
            inputs: gate_in(),
            outputs: gate_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("operator", operator(), true),
                ConfigField::new("value", Number, true),
            ],
            config: json!({ "token": "TON", "operator": ">", "value": 5 }),
        },
        Def {
            block_type: "balance_condition",
            category: Condition,
            name: "Balance Condition",
            description: "Passes when a wallet balance satisfies the comparison",
            inputs: gate_in(),
            outputs: gate_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("operator", operator(), true),
                ConfigField::new("value", Number, true),
            ],
            config: json!({ "token": "USDT", "operator": ">", "value": 100 }),
        },
        // ── Actions ──
        Def {
            block_type: "swap",
            category: Action,
            name: "Swap",
            description: "Swap one token for another on a DEX",
            inputs: vec![
                execute_in(),
                Port::new("amount", DataType::Number, false),
                Port::new("token", DataType::Token, false),
            ],
            outputs: result_out(),
            schema: vec![
                ConfigField::new("fromToken", Token, true),
                ConfigField::new("toToken", Token, true),
                ConfigField::new("amountType", amount_type(), true),
                ConfigField::new("amount", Number, true),
                ConfigField::new("maxSlippage", Number, false),
                ConfigField::new("dex", Text, false),
            ],
            config: json!({
                "fromToken": "USDT",
                "toToken": "TON",
                "amountType": "percentage",
                "amount": 10,
                "maxSlippage": 1,
                "dex": "stonfi",
            }),
        },
        Def {
            block_type: "stake",
            category: Action,
            name: "Stake",
            description: "Stake a token with a liquid staking protocol",
            inputs: vec![execute_in(), Port::new("amount", DataType::Number, false)],
            outputs: result_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("amountType", amount_type(), true),
                ConfigField::new("amount", Number, true),
                ConfigField::new("protocol", Text, false),
            ],
            config: json!({
                "token": "TON",
                "amountType": "percentage",
                "amount": 50,
                "protocol": "tonstakers",
            }),
        },
        Def {
            block_type: "transfer",
            category: Action,
            name: "Transfer",
            description: "Send tokens to a recipient",
            inputs: vec![
                execute_in(),
                Port::new("recipient", DataType::Address, false),
            ],
            outputs: result_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("amountType", amount_type(), true),
                ConfigField::new("amount", Number, true),
                ConfigField::new("recipient", Text, false),
            ],
            config: json!({ "token": "TON", "amountType": "fixed", "amount": 1 }),
        },
        Def {
            block_type: "add_liquidity",
            category: Action,
            name: "Add Liquidity",
            description: "Provide liquidity to a DEX pool",
            inputs: vec![execute_in()],
            outputs: result_out(),
            schema: vec![
                ConfigField::new("tokenA", Token, true),
                ConfigField::new("tokenB", Token, true),
                ConfigField::new("amountType", amount_type(), true),
                ConfigField::new("amount", Number, true),
                ConfigField::new("dex", Text, false),
            ],
            config: json!({
                "tokenA": "TON",
                "tokenB": "USDT",
                "amountType": "percentage",
                "amount": 10,
                "dex": "stonfi",
            }),
        },
        Def {
            block_type: "rebalance",
            category: Action,
            name: "Rebalance",
            description: "Move a token's share of the portfolio toward a target",
            inputs: vec![execute_in()],
            outputs: result_out(),
            schema: vec![
                ConfigField::new("token", Token, true),
                ConfigField::new("targetPercent", Number, true),
            ],
            config: json!({ "token": "TON", "targetPercent": 50 }),
        },
        // ── Risk controls ──
        Def {
            block_type: "stop_loss",
            category: Risk,
            name: "Stop Loss",
            description: "Halts execution once losses exceed a percentage",
            inputs: gate_in(),
            outputs: gate_out(),
            schema: vec![ConfigField::new("percentage", Number, true)],
            config: json!({ "percentage": 10 }),
        },
        Def {
            block_type: "position_limit",
            category: Risk,
            name: "Position Limit",
            description: "Caps any single position as a percentage of the portfolio",
            inputs: gate_in(),
            outputs: gate_out(),
            schema: vec![ConfigField::new("maxPercent", Number, true)],
            config: json!({ "maxPercent": 25 }),
        },
        Def {
            block_type: "daily_loss_limit",
            category: Risk,
            name: "Daily Loss Limit",
            description: "Stops trading for the day after a percentage loss",
            inputs: gate_in(),
            outputs: gate_out(),
            schema: vec![ConfigField::new("maxLoss", Number, true)],
            config: json!({ "maxLoss": 5 }),
        },
        // ── Capital ──
        Def {
            block_type: "capital_allocation",
            category: Capital,
            name: "Capital Allocation",
            description: "Share of the portfolio made available to downstream actions",
            inputs: vec![],
            outputs: vec![Port::new("amount", DataType::Number, false)],
            schema: vec![ConfigField::new("percentage", Number, true)],
            config: json!({ "percentage": 100 }),
        },
        // ── Utilities ──
        Def {
            block_type: "notification",
            category: Utility,
            name: "Notification",
            description: "Sends a message to the owner",
            inputs: vec![Port::new("in", DataType::Any, false)],
            outputs: vec![Port::new("out", DataType::Trigger, false)],
            schema: vec![ConfigField::new(
                "channel",
                select(&["telegram", "email", "webhook"]),
                true,
            )],
            config: json!({ "channel": "telegram" }),
        },
        Def {
            block_type: "delay",
            category: Utility,
            name: "Delay",
            description: "Waits before passing execution on",
            inputs: vec![Port::new("in", DataType::Any, false)],
            outputs: vec![Port::new("out", DataType::Trigger, false)],
            schema: vec![ConfigField::new("seconds", Number, true)],
            config: json!({ "seconds": 60 }),
        },
    ];

    defs.into_iter().map(BlockTypeDefinition::from).collect()
}
