//! Block type catalog — maps a block-type id to its schema and defaults.
//!
//! The catalog is a plain value handed to the compiler, validator and
//! simulator (usually behind an `Arc`). Instantiation clones the defaults
//! structurally, so no block ever aliases catalog state or another block.

mod defaults;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Block, BlockCategory, BlockId, Port, Position};

/// Kind of value a config field holds. Used by editors and by config checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFieldKind {
    Number,
    Text,
    Token,
    Boolean,
    Select(Vec<String>),
}

/// One entry in a block type's configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub kind: ConfigFieldKind,
    pub required: bool,
}

impl ConfigField {
    pub fn new(key: &str, kind: ConfigFieldKind, required: bool) -> Self {
        Self {
            key: key.to_string(),
            kind,
            required,
        }
    }
}

/// A reusable block template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeDefinition {
    #[serde(rename = "type")]
    pub block_type: String,
    pub category: BlockCategory,
    pub name: String,
    pub description: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub config_schema: Vec<ConfigField>,
    pub default_config: BTreeMap<String, Value>,
}

impl BlockTypeDefinition {
    /// Build a fresh block from this definition.
    pub fn instantiate(&self, id: BlockId, position: Position) -> Block {
        Block {
            id,
            block_type: self.block_type.clone(),
            category: self.category,
            name: self.name.clone(),
            config: self.default_config.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            position,
        }
    }
}

/// Registry of block type definitions, in registration order.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    definitions: Vec<BlockTypeDefinition>,
    index: HashMap<String, usize>,
}

impl BlockCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog pre-loaded with the built-in block types.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for def in defaults::builtin_definitions() {
            catalog.register(def);
        }
        catalog
    }

    /// Register a definition. An existing definition with the same type id is
    /// replaced in place and returned.
    pub fn register(&mut self, def: BlockTypeDefinition) -> Option<BlockTypeDefinition> {
        match self.index.get(&def.block_type) {
            Some(&i) => Some(std::mem::replace(&mut self.definitions[i], def)),
            None => {
                self.index
                    .insert(def.block_type.clone(), self.definitions.len());
                self.definitions.push(def);
                None
            }
        }
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockTypeDefinition> {
        self.index.get(block_type).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.index.contains_key(block_type)
    }

    pub fn by_category(&self, category: BlockCategory) -> Vec<&BlockTypeDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Instantiate a block of `block_type`. Returns `None` for unregistered types.
    pub fn create_block(
        &self,
        block_type: &str,
        id: impl Into<BlockId>,
        position: Position,
    ) -> Option<Block> {
        self.get(block_type)
            .map(|def| def.instantiate(id.into(), position))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.block_type.as_str())
    }

    pub fn definitions(&self) -> &[BlockTypeDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
