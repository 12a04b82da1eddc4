//! Domain types: blocks, ports, connections, strategies and their lifecycle.

pub mod block;
pub mod ids;
pub mod lifecycle;
pub mod strategy;

pub use block::{Block, BlockCategory, DataType, Port, Position};
pub use ids::{BlockId, ConnectionId, PortId, StrategyId};
pub use lifecycle::{DeploymentStatus, LifecycleError};
pub use strategy::{
    Connection, ExecutionSettings, RiskParameters, Strategy, StrategyCategory, TOKEN_CONFIG_KEYS,
};
