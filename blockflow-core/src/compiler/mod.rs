//! Graph compiler — Strategy ⇄ interchange form.
//!
//! `compile` flattens the editable graph into adjacency lists plus a content
//! hash. `decompile` is a deliberately lossy inverse: port names, data types
//! and canvas positions are not carried by the interchange form and are
//! reconstructed from what is observable. The one guarantee is that
//! `compile(decompile(c)).hash == c.hash`.

pub mod hash;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::catalog::BlockCatalog;
use crate::domain::{
    Block, BlockCategory, BlockId, Connection, ConnectionId, DataType, ExecutionSettings, Port,
    PortId, Position, RiskParameters, Strategy, StrategyCategory, StrategyId,
};

/// Current interchange format version.
pub const FORMAT_VERSION: u32 = 1;

const GRID_COLUMNS: usize = 4;
const GRID_DX: f64 = 250.0;
const GRID_DY: f64 = 150.0;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("malformed interchange form: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported interchange format version {found} (max supported: {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
}

// ─── Interchange form ────────────────────────────────────────────────

/// A trigger and the blocks it feeds directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTrigger {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: String,
    pub config: BTreeMap<String, Value>,
    pub next: Vec<BlockId>,
}

/// One block with its port-keyed neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledNode {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: String,
    pub category: BlockCategory,
    pub config: BTreeMap<String, Value>,
    /// Input port id → source block ids.
    pub inputs: BTreeMap<PortId, Vec<BlockId>>,
    /// Output port id → target block ids.
    pub outputs: BTreeMap<PortId, Vec<BlockId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledEdge {
    pub id: ConnectionId,
    pub source: BlockId,
    pub source_port: PortId,
    pub target: BlockId,
    pub target_port: PortId,
}

/// Flat, hashable view of a strategy used for storage and transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledStrategy {
    #[serde(default = "current_format_version")]
    pub format_version: u32,
    pub id: StrategyId,
    pub name: String,
    pub version: u32,
    pub category: StrategyCategory,
    pub triggers: Vec<CompiledTrigger>,
    pub nodes: Vec<CompiledNode>,
    pub edges: Vec<CompiledEdge>,
    pub risk_params: RiskParameters,
    pub config: ExecutionSettings,
    pub hash: String,
}

fn current_format_version() -> u32 {
    FORMAT_VERSION
}

// ─── Compiler ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GraphCompiler {
    catalog: Arc<BlockCatalog>,
}

impl GraphCompiler {
    pub fn new(catalog: Arc<BlockCatalog>) -> Self {
        Self { catalog }
    }

    /// Flatten a strategy. Unregistered block types pass through untouched.
    pub fn compile(&self, strategy: &Strategy) -> CompiledStrategy {
        let triggers = strategy
            .triggers()
            .map(|block| {
                let mut next: Vec<BlockId> = Vec::new();
                for c in strategy.outgoing(&block.id) {
                    if !next.contains(&c.target_block_id) {
                        next.push(c.target_block_id.clone());
                    }
                }
                CompiledTrigger {
                    id: block.id.clone(),
                    block_type: block.block_type.clone(),
                    config: block.config.clone(),
                    next,
                }
            })
            .collect();

        let nodes = strategy
            .blocks
            .iter()
            .map(|block| {
                let mut inputs: BTreeMap<PortId, Vec<BlockId>> = BTreeMap::new();
                for c in strategy.incoming(&block.id) {
                    inputs
                        .entry(c.target_port_id.clone())
                        .or_default()
                        .push(c.source_block_id.clone());
                }
                let mut outputs: BTreeMap<PortId, Vec<BlockId>> = BTreeMap::new();
                for c in strategy.outgoing(&block.id) {
                    outputs
                        .entry(c.source_port_id.clone())
                        .or_default()
                        .push(c.target_block_id.clone());
                }
                CompiledNode {
                    id: block.id.clone(),
                    block_type: block.block_type.clone(),
                    category: block.category,
                    config: block.config.clone(),
                    inputs,
                    outputs,
                }
            })
            .collect();

        let edges = strategy
            .connections
            .iter()
            .map(|c| CompiledEdge {
                id: c.id.clone(),
                source: c.source_block_id.clone(),
                source_port: c.source_port_id.clone(),
                target: c.target_block_id.clone(),
                target_port: c.target_port_id.clone(),
            })
            .collect();

        CompiledStrategy {
            format_version: FORMAT_VERSION,
            id: strategy.id.clone(),
            name: strategy.name.clone(),
            version: strategy.version,
            category: strategy.category,
            triggers,
            nodes,
            edges,
            risk_params: strategy.risk_params.clone(),
            config: strategy.config.clone(),
            hash: hash::content_hash(&strategy.blocks, &strategy.connections),
        }
    }

    /// Rebuild an editable strategy from the interchange form.
    ///
    /// Ports come from the observed adjacency keys only (typed `any`, never
    /// required); names come from the catalog when the type is registered;
    /// positions are laid out on a grid by node index.
    pub fn decompile(&self, compiled: &CompiledStrategy) -> Strategy {
        let blocks = compiled
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let name = self
                    .catalog
                    .get(&node.block_type)
                    .map(|def| def.name.clone())
                    .unwrap_or_else(|| node.block_type.clone());
                Block {
                    id: node.id.clone(),
                    block_type: node.block_type.clone(),
                    category: node.category,
                    name,
                    config: node.config.clone(),
                    inputs: observed_ports(node.inputs.keys()),
                    outputs: observed_ports(node.outputs.keys()),
                    position: grid_position(i),
                }
            })
            .collect();

        let connections = compiled
            .edges
            .iter()
            .map(|e| Connection {
                id: e.id.clone(),
                source_block_id: e.source.clone(),
                source_port_id: e.source_port.clone(),
                target_block_id: e.target.clone(),
                target_port_id: e.target_port.clone(),
            })
            .collect();

        Strategy {
            id: compiled.id.clone(),
            name: compiled.name.clone(),
            description: String::new(),
            version: compiled.version,
            category: compiled.category,
            blocks,
            connections,
            risk_params: compiled.risk_params.clone(),
            config: compiled.config.clone(),
        }
    }

    /// Recompute the hash of a (possibly transported) compiled form.
    pub fn verify_hash(&self, compiled: &CompiledStrategy) -> bool {
        let strategy = self.decompile(compiled);
        hash::content_hash(&strategy.blocks, &strategy.connections) == compiled.hash
    }

    pub fn to_json(&self, compiled: &CompiledStrategy) -> Result<String, CompileError> {
        Ok(serde_json::to_string_pretty(compiled)?)
    }

    /// Parse the interchange wire format. The one graph path that fails fast.
    pub fn from_json(&self, json: &str) -> Result<CompiledStrategy, CompileError> {
        let compiled: CompiledStrategy = serde_json::from_str(json)?;
        if compiled.format_version > FORMAT_VERSION {
            return Err(CompileError::UnsupportedVersion {
                found: compiled.format_version,
            });
        }
        Ok(compiled)
    }
}

fn observed_ports<'a>(keys: impl Iterator<Item = &'a PortId>) -> Vec<Port> {
    keys.map(|id| Port {
        id: id.clone(),
        name: id.to_string(),
        data_type: DataType::Any,
        required: false,
    })
    .collect()
}

fn grid_position(index: usize) -> Position {
    Position::new(
        (index % GRID_COLUMNS) as f64 * GRID_DX,
        (index / GRID_COLUMNS) as f64 * GRID_DY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiler() -> GraphCompiler {
        GraphCompiler::new(Arc::new(BlockCatalog::with_defaults()))
    }

    fn sample() -> Strategy {
        let catalog = BlockCatalog::with_defaults();
        let mut trigger = catalog
            .create_block("schedule_trigger", "t1", Position::new(10.0, 20.0))
            .unwrap();
        trigger.config.insert("interval".into(), json!(600));
        let cond = catalog
            .create_block("price_condition", "c1", Position::default())
            .unwrap();
        let swap = catalog
            .create_block("swap", "a1", Position::default())
            .unwrap();
        Strategy::new("s1", "Sample", StrategyCategory::Trading)
            .with_block(trigger)
            .with_block(cond)
            .with_block(swap)
            .with_connection(Connection::new("e1", ("t1", "trigger"), ("c1", "in")))
            .with_connection(Connection::new("e2", ("c1", "out"), ("a1", "execute")))
            .with_connection(Connection::new("e3", ("t1", "trigger"), ("a1", "execute")))
    }

    #[test]
    fn triggers_list_distinct_successors() {
        let compiled = compiler().compile(&sample());
        assert_eq!(compiled.triggers.len(), 1);
        assert_eq!(
            compiled.triggers[0].next,
            vec![BlockId::new("c1"), BlockId::new("a1")]
        );
    }

    #[test]
    fn adjacency_is_port_keyed() {
        let compiled = compiler().compile(&sample());
        let swap = compiled.nodes.iter().find(|n| n.id.as_str() == "a1").unwrap();
        assert_eq!(
            swap.inputs[&PortId::new("execute")],
            vec![BlockId::new("c1"), BlockId::new("t1")]
        );
        let trigger = &compiled.nodes[0];
        assert_eq!(trigger.outputs[&PortId::new("trigger")].len(), 2);
        assert!(trigger.inputs.is_empty());
    }

    #[test]
    fn compile_is_deterministic() {
        let c = compiler();
        let s = sample();
        assert_eq!(c.compile(&s).hash, c.compile(&s).hash);
    }

    #[test]
    fn decompile_is_lossy_but_hash_stable() {
        let c = compiler();
        let original = sample();
        let compiled = c.compile(&original);
        let rebuilt = c.decompile(&compiled);

        assert_ne!(rebuilt, original);
        assert_eq!(rebuilt.blocks[0].position, Position::new(0.0, 0.0));
        assert_eq!(rebuilt.blocks[2].position, Position::new(500.0, 0.0));
        assert_eq!(rebuilt.blocks[2].name, "Swap");
        assert!(rebuilt.blocks[2]
            .inputs
            .iter()
            .all(|p| p.data_type == DataType::Any && !p.required));
        // Unconnected ports are not recoverable.
        assert_eq!(rebuilt.blocks[2].inputs.len(), 1);

        assert_eq!(c.compile(&rebuilt).hash, compiled.hash);
        assert!(c.verify_hash(&compiled));
    }

    #[test]
    fn unknown_types_pass_through() {
        let c = compiler();
        let mut s = sample();
        s.blocks[1].block_type = "quantum_oracle".into();
        let compiled = c.compile(&s);
        assert_eq!(compiled.nodes[1].block_type, "quantum_oracle");
        let rebuilt = c.decompile(&compiled);
        assert_eq!(rebuilt.blocks[1].name, "quantum_oracle");
    }

    #[test]
    fn json_round_trip() {
        let c = compiler();
        let compiled = c.compile(&sample());
        let json = c.to_json(&compiled).unwrap();
        assert!(json.contains("\"riskParams\""));
        assert!(json.contains("\"sourcePort\""));
        let back = c.from_json(&json).unwrap();
        assert_eq!(back, compiled);
    }

    #[test]
    fn malformed_json_fails_fast() {
        let c = compiler();
        assert!(matches!(
            c.from_json("{\"id\": 3}"),
            Err(CompileError::Malformed(_))
        ));
        assert!(matches!(c.from_json("not json"), Err(CompileError::Malformed(_))));
    }

    #[test]
    fn future_format_version_rejected() {
        let c = compiler();
        let mut v = serde_json::to_value(c.compile(&sample())).unwrap();
        v["formatVersion"] = json!(FORMAT_VERSION + 1);
        let err = c.from_json(&v.to_string()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedVersion { .. }));
    }

    #[test]
    fn tampered_hash_detected() {
        let c = compiler();
        let mut compiled = c.compile(&sample());
        compiled.nodes[0]
            .config
            .insert("interval".into(), json!(1));
        assert!(!c.verify_hash(&compiled));
    }
}
