//! Strategy — the full block graph plus risk parameters and execution settings.

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockCategory};
use super::ids::{BlockId, ConnectionId, PortId, StrategyId};

/// Config keys that name a token on any block.
pub const TOKEN_CONFIG_KEYS: [&str; 5] = ["token", "fromToken", "toToken", "tokenA", "tokenB"];

/// Business category of a strategy. Drives the base offset of the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    Trading,
    Arbitrage,
    LiquidityManagement,
    YieldFarming,
    PortfolioAutomation,
    Custom,
}

/// A directed edge from one block's output port to another block's input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source_block_id: BlockId,
    pub source_port_id: PortId,
    pub target_block_id: BlockId,
    pub target_port_id: PortId,
}

impl Connection {
    pub fn new(id: &str, source: (&str, &str), target: (&str, &str)) -> Self {
        Self {
            id: ConnectionId::new(id),
            source_block_id: BlockId::new(source.0),
            source_port_id: PortId::new(source.1),
            target_block_id: BlockId::new(target.0),
            target_port_id: PortId::new(target.1),
        }
    }
}

/// Risk limits, all expressed in percent.
///
/// `stop_loss_percent` and `take_profit_percent` of zero mean "not configured".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskParameters {
    pub max_position_size: f64,
    pub max_daily_loss: f64,
    pub max_drawdown: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    pub max_slippage: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_size: 25.0,
            max_daily_loss: 5.0,
            max_drawdown: 15.0,
            stop_loss_percent: 0.0,
            take_profit_percent: 0.0,
            max_slippage: 1.0,
        }
    }
}

/// Execution settings that travel with the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionSettings {
    pub notifications_enabled: bool,
    pub dry_run: bool,
    pub max_gas_per_day: Option<u64>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            dry_run: false,
            max_gas_per_day: None,
        }
    }
}

/// One automated workflow: blocks, connections, risk parameters and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub category: StrategyCategory,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub risk_params: RiskParameters,
    #[serde(default)]
    pub config: ExecutionSettings,
}

fn default_version() -> u32 {
    1
}

impl Strategy {
    pub fn new(id: &str, name: &str, category: StrategyCategory) -> Self {
        Self {
            id: StrategyId::new(id),
            name: name.to_string(),
            description: String::new(),
            version: 1,
            category,
            blocks: Vec::new(),
            connections: Vec::new(),
            risk_params: RiskParameters::default(),
            config: ExecutionSettings::default(),
        }
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn blocks_of(&self, category: BlockCategory) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.category == category)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Block> {
        self.blocks_of(BlockCategory::Trigger)
    }

    /// Connections leaving `id`, in connection order.
    pub fn outgoing<'a>(&'a self, id: &'a BlockId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| &c.source_block_id == id)
    }

    /// Connections entering `id`, in connection order.
    pub fn incoming<'a>(&'a self, id: &'a BlockId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| &c.target_block_id == id)
    }

    /// Every token named in a block config, in block order, deduplicated.
    pub fn referenced_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for block in &self.blocks {
            for key in TOKEN_CONFIG_KEYS {
                if let Some(token) = block.config_str(key) {
                    if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                        tokens.push(token.to_string());
                    }
                }
            }
        }
        tokens
    }

    /// Builder-style helpers used by tests and callers assembling graphs in code.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }
}
