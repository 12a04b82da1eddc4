//! Simulation plan — triggers and actions resolved once from the graph.
//!
//! Behaviour is selected by block type id at plan time and carried as closed
//! enums; the tick loop never looks at names or config maps.

use serde::{Deserialize, Serialize};

use crate::domain::{Block, BlockCategory, BlockId, Strategy};

/// Interval assumed for a schedule trigger whose interval is missing or not positive.
pub const DEFAULT_INTERVAL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn holds(self, price: f64, threshold: f64) -> bool {
        match self {
            Direction::Above => price >= threshold,
            Direction::Below => price <= threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKind {
    Schedule {
        interval_secs: i64,
    },
    Price {
        token: String,
        threshold: f64,
        direction: Direction,
    },
    /// External signals never fire in simulation.
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    Percentage,
    Fixed,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountSpec {
    pub kind: AmountType,
    pub value: f64,
}

impl AmountSpec {
    fn from_block(block: &Block) -> Self {
        let kind = match block.config_str("amountType") {
            Some("fixed") => AmountType::Fixed,
            Some("all") => AmountType::All,
            _ => AmountType::Percentage,
        };
        Self {
            kind,
            value: block.config_f64("amount").unwrap_or(0.0).max(0.0),
        }
    }

    /// Quantity to move out of `balance`. Never exceeds the balance.
    pub fn resolve(&self, balance: f64) -> f64 {
        let balance = balance.max(0.0);
        match self.kind {
            AmountType::Percentage => balance * (self.value / 100.0).min(1.0),
            AmountType::Fixed => self.value.min(balance),
            AmountType::All => balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Swap {
        from: String,
        to: String,
        amount: AmountSpec,
        /// Percent.
        max_slippage: f64,
    },
    Stake {
        token: String,
        amount: AmountSpec,
    },
    Transfer {
        token: String,
        amount: AmountSpec,
    },
    AddLiquidity {
        token_a: String,
        token_b: String,
        amount: AmountSpec,
    },
    Rebalance {
        token: String,
        target_percent: f64,
        max_slippage: f64,
    },
    Unsupported {
        block_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTrigger {
    pub block_id: BlockId,
    pub kind: TriggerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub block_id: BlockId,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationPlan {
    pub triggers: Vec<PlannedTrigger>,
    pub actions: Vec<PlannedAction>,
}

impl SimulationPlan {
    /// Resolve every trigger and action block, in block order.
    pub fn from_strategy(strategy: &Strategy) -> Self {
        let default_slippage = strategy.risk_params.max_slippage.max(0.0);
        let triggers = strategy
            .triggers()
            .map(|b| PlannedTrigger {
                block_id: b.id.clone(),
                kind: resolve_trigger(b),
            })
            .collect();
        let actions = strategy
            .blocks_of(BlockCategory::Action)
            .map(|b| PlannedAction {
                block_id: b.id.clone(),
                kind: resolve_action(b, default_slippage),
            })
            .collect();
        Self { triggers, actions }
    }

    /// Tokens the plan trades or watches, excluding staked buckets.
    pub fn tokens(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut add = |t: &str| {
            if !t.is_empty() && !out.iter().any(|o| o == t) {
                out.push(t.to_string());
            }
        };
        for t in &self.triggers {
            if let TriggerKind::Price { token, .. } = &t.kind {
                add(token);
            }
        }
        for a in &self.actions {
            match &a.kind {
                ActionKind::Swap { from, to, .. } => {
                    add(from);
                    add(to);
                }
                ActionKind::Stake { token, .. }
                | ActionKind::Transfer { token, .. }
                | ActionKind::Rebalance { token, .. } => add(token),
                ActionKind::AddLiquidity {
                    token_a, token_b, ..
                } => {
                    add(token_a);
                    add(token_b);
                }
                ActionKind::Unsupported { .. } => {}
            }
        }
        out
    }
}

fn token(block: &Block, key: &str, fallback: &str) -> String {
    block
        .config_str(key)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn resolve_trigger(block: &Block) -> TriggerKind {
    match block.block_type.as_str() {
        "schedule_trigger" => {
            let interval = block
                .config_f64("interval")
                .filter(|v| *v > 0.0)
                .map(|v| v.round() as i64)
                .unwrap_or(DEFAULT_INTERVAL_SECS);
            TriggerKind::Schedule {
                interval_secs: interval.max(1),
            }
        }
        "price_trigger" => TriggerKind::Price {
            token: token(block, "token", "TON"),
            threshold: block.config_f64("threshold").unwrap_or(0.0),
            direction: match block.config_str("direction") {
                Some("below") => Direction::Below,
                _ => Direction::Above,
            },
        },
        _ => TriggerKind::Signal,
    }
}

fn resolve_action(block: &Block, default_slippage: f64) -> ActionKind {
    let slippage = || {
        block
            .config_f64("maxSlippage")
            .filter(|v| *v >= 0.0)
            .unwrap_or(default_slippage)
    };
    match block.block_type.as_str() {
        "swap" => ActionKind::Swap {
            from: token(block, "fromToken", "USDT"),
            to: token(block, "toToken", "TON"),
            amount: AmountSpec::from_block(block),
            max_slippage: slippage(),
        },
        "stake" => ActionKind::Stake {
            token: token(block, "token", "TON"),
            amount: AmountSpec::from_block(block),
        },
        "transfer" => ActionKind::Transfer {
            token: token(block, "token", "TON"),
            amount: AmountSpec::from_block(block),
        },
        "add_liquidity" => ActionKind::AddLiquidity {
            token_a: token(block, "tokenA", "TON"),
            token_b: token(block, "tokenB", "USDT"),
            amount: AmountSpec::from_block(block),
        },
        "rebalance" => ActionKind::Rebalance {
            token: token(block, "token", "TON"),
            target_percent: block
                .config_f64("targetPercent")
                .unwrap_or(0.0)
                .clamp(0.0, 100.0),
            max_slippage: slippage(),
        },
        other => ActionKind::Unsupported {
            block_type: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockCatalog;
    use crate::domain::{Position, StrategyCategory};
    use serde_json::json;

    fn strategy(types: &[&str]) -> Strategy {
        let catalog = BlockCatalog::with_defaults();
        let mut s = Strategy::new("s", "S", StrategyCategory::Trading);
        for (i, ty) in types.iter().enumerate() {
            s.blocks.push(
                catalog
                    .create_block(ty, format!("b{i}"), Position::default())
                    .unwrap(),
            );
        }
        s
    }

    #[test]
    fn resolves_by_type_id_not_name() {
        let mut s = strategy(&["schedule_trigger", "swap", "stake", "notification"]);
        s.blocks[2].name = "Swap my stake".into();
        let plan = SimulationPlan::from_strategy(&s);
        assert_eq!(plan.triggers.len(), 1);
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(plan.actions[0].kind, ActionKind::Swap { .. }));
        assert!(matches!(plan.actions[1].kind, ActionKind::Stake { .. }));
        assert_eq!(
            plan.triggers[0].kind,
            TriggerKind::Schedule {
                interval_secs: 3600
            }
        );
    }

    #[test]
    fn swap_falls_back_to_risk_slippage() {
        let mut s = strategy(&["swap"]);
        s.blocks[0].config.remove("maxSlippage");
        s.risk_params.max_slippage = 0.7;
        let plan = SimulationPlan::from_strategy(&s);
        match &plan.actions[0].kind {
            ActionKind::Swap { max_slippage, .. } => assert_eq!(*max_slippage, 0.7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn amount_types_resolve_against_balance() {
        let pct = AmountSpec {
            kind: AmountType::Percentage,
            value: 50.0,
        };
        let fixed = AmountSpec {
            kind: AmountType::Fixed,
            value: 300.0,
        };
        let all = AmountSpec {
            kind: AmountType::All,
            value: 0.0,
        };
        assert_eq!(pct.resolve(1000.0), 500.0);
        assert_eq!(fixed.resolve(1000.0), 300.0);
        assert_eq!(fixed.resolve(100.0), 100.0);
        assert_eq!(all.resolve(42.0), 42.0);
        assert_eq!(pct.resolve(-5.0), 0.0);
    }

    #[test]
    fn unknown_action_is_unsupported_and_price_trigger_parsed() {
        let mut s = strategy(&["price_trigger", "swap"]);
        s.blocks[0].config.insert("direction".into(), json!("below"));
        s.blocks[0].config.insert("threshold".into(), json!("4.5"));
        s.blocks[1].block_type = "bridge".into();
        let plan = SimulationPlan::from_strategy(&s);
        assert_eq!(
            plan.triggers[0].kind,
            TriggerKind::Price {
                token: "TON".into(),
                threshold: 4.5,
                direction: Direction::Below
            }
        );
        assert_eq!(
            plan.actions[0].kind,
            ActionKind::Unsupported {
                block_type: "bridge".into()
            }
        );
    }

    #[test]
    fn tokens_are_deduplicated() {
        let s = strategy(&["price_trigger", "swap", "stake", "add_liquidity"]);
        let plan = SimulationPlan::from_strategy(&s);
        assert_eq!(plan.tokens(), vec!["TON", "USDT"]);
    }

    #[test]
    fn direction_is_inclusive() {
        assert!(Direction::Above.holds(5.0, 5.0));
        assert!(Direction::Below.holds(5.0, 5.0));
        assert!(!Direction::Above.holds(4.9, 5.0));
    }
}
