//! Backtest engine — simulation plan, mutable state and the tick loop.
//!
//! The engine consumes a `SimulationPlan` (resolved once from the graph) and
//! an aligned `PriceSeries`, then runs the tick loop:
//!
//! 1. Triggers: schedule and price triggers are evaluated against the tick
//! 2. Actions: on any firing, every action executes (flat semantics)
//! 3. Mark-to-market: equity, running peak, drawdown

pub mod event_loop;
pub mod plan;
pub mod state;

pub use event_loop::run_simulation;
pub use plan::{
    ActionKind, AmountSpec, AmountType, Direction, PlannedAction, PlannedTrigger, SimulationPlan,
    TriggerKind,
};
pub use state::{
    staked_bucket, DrawdownPoint, EngineConfig, EquityPoint, SimulationOutcome, SimulationState,
    TerminationReason, Trade, TradeKind,
};
