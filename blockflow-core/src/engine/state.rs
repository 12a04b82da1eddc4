//! Engine configuration, mutable simulation state, and run output types.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::BlockId;

/// Prefix of the synthetic bucket holding a staked token.
pub const STAKED_PREFIX: &str = "staked_";

pub fn staked_bucket(token: &str) -> String {
    format!("{STAKED_PREFIX}{token}")
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Token the capital is held in. Always priced at 1.
    pub quote_token: String,
    /// Flat cost debited from capital per executed action, in quote units.
    pub gas_cost_per_tx: f64,
    /// Trades worth less than this (quote units) are skipped.
    pub min_trade_value: f64,
    /// Fraction of the maximum slippage actually available to sampling.
    pub slippage_multiplier: f64,
    /// Prices used when a token has no data.
    pub fallback_prices: BTreeMap<String, f64>,
    /// Wall-clock budget for the tick loop.
    pub max_duration: Option<Duration>,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            quote_token: "USDT".to_string(),
            gas_cost_per_tx: 0.05,
            min_trade_value: 1.0,
            slippage_multiplier: 1.0,
            fallback_prices: BTreeMap::new(),
            max_duration: None,
        }
    }
}

/// Mutable state that evolves tick-by-tick.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Unassigned quote balance.
    pub capital: f64,
    /// Token (or staked bucket) → amount held.
    pub positions: BTreeMap<String, f64>,
    /// Token → total quote cost of the amount currently held.
    pub cost_basis: BTreeMap<String, f64>,
    pub trade_count: usize,
    pub tick: usize,
    pub trigger_firings: usize,
    pub gas_spent: f64,
    pub peak_equity: f64,
    pub(crate) last_fired: HashMap<BlockId, DateTime<Utc>>,
    pub(crate) price_condition: HashMap<BlockId, bool>,
    pub(crate) last_price: HashMap<String, f64>,
    pub(crate) fallback_warned: HashSet<String>,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            positions: BTreeMap::new(),
            cost_basis: BTreeMap::new(),
            trade_count: 0,
            tick: 0,
            trigger_firings: 0,
            gas_spent: 0.0,
            peak_equity: initial_capital,
            last_fired: HashMap::new(),
            price_condition: HashMap::new(),
            last_price: HashMap::new(),
            fallback_warned: HashSet::new(),
        }
    }

    pub fn balance(&self, token: &str) -> f64 {
        self.positions.get(token).copied().unwrap_or(0.0)
    }

    /// Average quote cost per unit of `token` currently held.
    pub fn average_cost(&self, token: &str) -> Option<f64> {
        let held = self.balance(token);
        if held <= 0.0 {
            return None;
        }
        self.cost_basis.get(token).map(|c| c / held)
    }

    pub(crate) fn credit(&mut self, token: &str, amount: f64, cost: f64) {
        *self.positions.entry(token.to_string()).or_insert(0.0) += amount;
        *self.cost_basis.entry(token.to_string()).or_insert(0.0) += cost;
    }

    /// Remove `amount` of `token`, returning the cost basis released with it.
    pub(crate) fn debit(&mut self, token: &str, amount: f64) -> f64 {
        let held = self.balance(token);
        if held <= 0.0 {
            return 0.0;
        }
        let fraction = (amount / held).clamp(0.0, 1.0);
        let basis = self.cost_basis.get(token).copied().unwrap_or(0.0);
        let released = basis * fraction;
        let remaining = held - amount;
        if remaining <= 1e-12 {
            self.positions.remove(token);
            self.cost_basis.remove(token);
        } else {
            self.positions.insert(token.to_string(), remaining);
            self.cost_basis.insert(token.to_string(), basis - released);
        }
        released
    }
}

/// Kind of executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Swap,
    Stake,
    Rebalance,
}

/// One executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub tick: usize,
    pub block_id: BlockId,
    pub kind: TradeKind,
    pub from_token: String,
    pub to_token: String,
    pub amount_in: f64,
    pub amount_out: f64,
    /// Quote price of `from_token` at execution.
    pub price: f64,
    /// Percent.
    pub slippage: f64,
    pub gas: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub timestamp: DateTime<Utc>,
    /// Percent below the running peak, in [0, 100].
    pub drawdown: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Timeout,
    Cancelled,
}

/// Everything the tick loop produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub trigger_firings: usize,
    pub gas_spent: f64,
    pub terminated: Option<TerminationReason>,
    /// Tokens that were priced from fallbacks at least once.
    pub fallback_tokens: Vec<String>,
    pub final_state: SimulationState,
}
