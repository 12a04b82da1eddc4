//! Compiler round trips through the JSON wire formats.

use std::sync::Arc;

use blockflow_core::catalog::BlockCatalog;
use blockflow_core::compiler::GraphCompiler;
use blockflow_core::domain::Strategy;

const STRATEGY_JSON: &str = r#"{
  "id": "grid-ton",
  "name": "TON dip buyer",
  "version": 3,
  "category": "trading",
  "blocks": [
    {
      "id": "tick",
      "type": "schedule_trigger",
      "category": "trigger",
      "name": "Every hour",
      "config": { "interval": 3600 },
      "inputs": [],
      "outputs": [{ "id": "trigger", "name": "trigger", "dataType": "trigger", "required": false }],
      "position": { "x": 0, "y": 0 }
    },
    {
      "id": "dip",
      "type": "price_condition",
      "category": "condition",
      "name": "TON below 4",
      "config": { "token": "TON", "operator": "<", "value": 4 },
      "inputs": [{ "id": "in", "name": "in", "dataType": "boolean", "required": true }],
      "outputs": [{ "id": "out", "name": "out", "dataType": "boolean", "required": false }],
      "position": { "x": 250, "y": 0 }
    },
    {
      "id": "buy",
      "type": "swap",
      "category": "action",
      "name": "Buy TON",
      "config": { "fromToken": "USDT", "toToken": "TON", "amountType": "percentage", "amount": 20 },
      "inputs": [{ "id": "execute", "name": "execute", "dataType": "boolean", "required": true }],
      "outputs": [{ "id": "result", "name": "result", "dataType": "boolean", "required": false }],
      "position": { "x": 500, "y": 0 }
    }
  ],
  "connections": [
    { "id": "e1", "sourceBlockId": "tick", "sourcePortId": "trigger", "targetBlockId": "dip", "targetPortId": "in" },
    { "id": "e2", "sourceBlockId": "dip", "sourcePortId": "out", "targetBlockId": "buy", "targetPortId": "execute" }
  ],
  "riskParams": { "maxPositionSize": 20, "maxDailyLoss": 3, "maxDrawdown": 10, "stopLossPercent": 5, "takeProfitPercent": 0, "maxSlippage": 1 }
}"#;

fn compiler() -> GraphCompiler {
    GraphCompiler::new(Arc::new(BlockCatalog::with_defaults()))
}

fn strategy() -> Strategy {
    serde_json::from_str(STRATEGY_JSON).expect("fixture parses")
}

#[test]
fn wire_strategy_compiles_to_adjacency_form() {
    let compiled = compiler().compile(&strategy());
    assert_eq!(compiled.version, 3);
    assert_eq!(compiled.triggers.len(), 1);
    assert_eq!(compiled.triggers[0].next[0].as_str(), "dip");
    assert_eq!(compiled.nodes.len(), 3);
    assert_eq!(compiled.edges.len(), 2);
    assert!(!compiled.hash.is_empty() && compiled.hash.len() <= 8);
    assert!(compiled.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(u32::from_str_radix(&compiled.hash, 16).is_ok());
}

#[test]
fn hash_survives_json_transport_and_decompile() {
    let c = compiler();
    let compiled = c.compile(&strategy());
    let json = c.to_json(&compiled).unwrap();
    let received = c.from_json(&json).unwrap();
    assert!(c.verify_hash(&received));

    let rebuilt = c.decompile(&received);
    assert_eq!(c.compile(&rebuilt).hash, compiled.hash);
    assert_eq!(rebuilt.risk_params, strategy().risk_params);
}

#[test]
fn layout_and_names_do_not_affect_hash() {
    let c = compiler();
    let original = strategy();
    let mut moved = original.clone();
    for block in &mut moved.blocks {
        block.position.x += 1000.0;
        block.name = format!("renamed {}", block.name);
    }
    assert_eq!(c.compile(&original).hash, c.compile(&moved).hash);
}

#[test]
fn config_changes_do_change_hash() {
    let c = compiler();
    let original = strategy();
    let mut edited = original.clone();
    edited.blocks[2]
        .config
        .insert("amount".into(), serde_json::json!(21));
    assert_ne!(c.compile(&original).hash, c.compile(&edited).hash);
}
