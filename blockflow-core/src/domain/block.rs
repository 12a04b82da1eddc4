//! Blocks and ports — the typed nodes of a strategy graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{BlockId, PortId};

/// Functional category of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Trigger,
    Condition,
    Action,
    Risk,
    Capital,
    Utility,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 6] = [
        BlockCategory::Trigger,
        BlockCategory::Condition,
        BlockCategory::Action,
        BlockCategory::Risk,
        BlockCategory::Capital,
        BlockCategory::Utility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockCategory::Trigger => "trigger",
            BlockCategory::Condition => "condition",
            BlockCategory::Action => "action",
            BlockCategory::Risk => "risk",
            BlockCategory::Capital => "capital",
            BlockCategory::Utility => "utility",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Data type carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Trigger,
    Boolean,
    Number,
    Token,
    Address,
    Text,
    Any,
}

impl DataType {
    /// Whether a value of type `self` (an output) may flow into `target` (an input).
    ///
    /// Identical types match, `any` accepts everything, and a trigger pulse may
    /// feed a boolean input. Everything else is a mismatch.
    pub fn flows_into(self, target: DataType) -> bool {
        self == target
            || target == DataType::Any
            || (self == DataType::Trigger && target == DataType::Boolean)
    }
}

/// A typed connection point on a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
}

impl Port {
    pub fn new(id: &str, data_type: DataType, required: bool) -> Self {
        Self {
            id: PortId::new(id),
            name: id.to_string(),
            data_type,
            required,
        }
    }
}

/// Editor canvas position. Carries no semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One node instance in a strategy graph.
///
/// `config` is a `BTreeMap` so its serialization, and therefore the content
/// hash of a compiled strategy, does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: String,
    pub category: BlockCategory,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    #[serde(default)]
    pub position: Position,
}

impl Block {
    pub fn input(&self, port: &PortId) -> Option<&Port> {
        self.inputs.iter().find(|p| &p.id == port)
    }

    pub fn output(&self, port: &PortId) -> Option<&Port> {
        self.outputs.iter().find(|p| &p.id == port)
    }

    pub fn is_trigger(&self) -> bool {
        self.category == BlockCategory::Trigger
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Numeric config value. Numeric strings (`"3600"`) are accepted too,
    /// since editor forms frequently store numbers as text.
    pub fn config_f64(&self, key: &str) -> Option<f64> {
        match self.config.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_rule() {
        assert!(DataType::Number.flows_into(DataType::Number));
        assert!(DataType::Token.flows_into(DataType::Any));
        assert!(DataType::Trigger.flows_into(DataType::Boolean));
        assert!(!DataType::Boolean.flows_into(DataType::Trigger));
        assert!(!DataType::Number.flows_into(DataType::Token));
        assert!(!DataType::Any.flows_into(DataType::Number));
    }

    #[test]
    fn category_parse_roundtrip() {
        for c in BlockCategory::ALL {
            assert_eq!(BlockCategory::parse(c.as_str()), Some(c));
        }
        assert_eq!(BlockCategory::parse("nope"), None);
    }

    #[test]
    fn numeric_config_accepts_strings() {
        let mut block = Block {
            id: BlockId::new("b"),
            block_type: "schedule_trigger".into(),
            category: BlockCategory::Trigger,
            name: String::new(),
            config: BTreeMap::new(),
            inputs: vec![],
            outputs: vec![],
            position: Position::default(),
        };
        block.config.insert("interval".into(), Value::from("3600"));
        assert_eq!(block.config_f64("interval"), Some(3600.0));
        block.config.insert("interval".into(), Value::from(60));
        assert_eq!(block.config_f64("interval"), Some(60.0));
        block.config.insert("interval".into(), Value::Bool(true));
        assert_eq!(block.config_f64("interval"), None);
    }
}
