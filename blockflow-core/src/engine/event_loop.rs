//! Tick-by-tick event loop.
//!
//! Per tick, in order:
//! 1. Stop if cancelled or over the wall-clock budget
//! 2. Evaluate every trigger against the tick
//! 3. If any trigger fired, execute every action in block order
//! 4. Mark to market: equity, running peak, drawdown
//!
//! Equity at tick `t` only ever reads prices at ticks `<= t`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::data::{default_price, PriceSeries};
use crate::domain::BlockId;

use super::plan::{ActionKind, AmountSpec, PlannedAction, SimulationPlan, TriggerKind};
use super::state::{
    staked_bucket, DrawdownPoint, EngineConfig, EquityPoint, SimulationOutcome, SimulationState,
    TerminationReason, Trade, TradeKind, STAKED_PREFIX,
};

struct Ticker<'a> {
    config: &'a EngineConfig,
    series: &'a PriceSeries,
    state: SimulationState,
    trades: Vec<Trade>,
    tick: usize,
    timestamp: DateTime<Utc>,
}

/// Run `plan` over `series`. Never fails: missing prices degrade to
/// fallbacks and early termination is reported on the outcome.
pub fn run_simulation<R: Rng + ?Sized>(
    plan: &SimulationPlan,
    series: &PriceSeries,
    config: &EngineConfig,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> SimulationOutcome {
    let started = Instant::now();
    let mut ticker = Ticker {
        config,
        series,
        state: SimulationState::new(config.initial_capital),
        trades: Vec::new(),
        tick: 0,
        timestamp: series.timestamps.first().copied().unwrap_or_else(Utc::now),
    };
    let mut equity_curve = Vec::with_capacity(series.len());
    let mut drawdown_curve = Vec::with_capacity(series.len());
    let mut terminated = None;

    for (i, &timestamp) in series.timestamps.iter().enumerate() {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            warn!(tick = i, "simulation cancelled");
            terminated = Some(TerminationReason::Cancelled);
            break;
        }
        if config.max_duration.is_some_and(|max| started.elapsed() >= max) {
            warn!(tick = i, "simulation exceeded its time budget");
            terminated = Some(TerminationReason::Timeout);
            break;
        }

        ticker.tick = i;
        ticker.timestamp = timestamp;
        ticker.state.tick = i;

        // ─── Triggers ───
        let mut fired = false;
        for trigger in &plan.triggers {
            if ticker.trigger_fires(&trigger.block_id, &trigger.kind) {
                ticker.state.last_fired.insert(trigger.block_id.clone(), timestamp);
                ticker.state.trigger_firings += 1;
                fired = true;
            }
        }

        // ─── Actions ───
        if fired {
            for action in &plan.actions {
                if let Some(trade) = ticker.execute(action, rng) {
                    ticker.state.trade_count += 1;
                    ticker.trades.push(trade);
                }
            }
        }

        // ─── Mark to market ───
        let equity = ticker.equity();
        if equity > ticker.state.peak_equity {
            ticker.state.peak_equity = equity;
        }
        let peak = ticker.state.peak_equity;
        let drawdown = if peak > 0.0 {
            ((peak - equity) / peak * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        equity_curve.push(EquityPoint { timestamp, equity });
        drawdown_curve.push(DrawdownPoint {
            timestamp,
            drawdown,
        });
    }

    debug!(
        ticks = equity_curve.len(),
        trades = ticker.trades.len(),
        firings = ticker.state.trigger_firings,
        "simulation loop finished"
    );

    let mut fallback_tokens: Vec<String> = ticker.state.fallback_warned.iter().cloned().collect();
    fallback_tokens.sort();

    SimulationOutcome {
        trades: ticker.trades,
        equity_curve,
        drawdown_curve,
        trigger_firings: ticker.state.trigger_firings,
        gas_spent: ticker.state.gas_spent,
        terminated,
        fallback_tokens,
        final_state: ticker.state,
    }
}

impl<'a> Ticker<'a> {
    fn is_quote(&self, token: &str) -> bool {
        token == self.config.quote_token
    }

    /// Quote price of `token` (or its staked bucket) at the current tick.
    fn price(&mut self, token: &str) -> f64 {
        let underlying = token.strip_prefix(STAKED_PREFIX).unwrap_or(token);
        if self.is_quote(underlying) {
            return 1.0;
        }
        if let Some(p) = self.series.price(underlying, self.tick) {
            self.state.last_price.insert(underlying.to_string(), p);
            return p;
        }
        if let Some(&p) = self.state.last_price.get(underlying) {
            return p;
        }
        if self.state.fallback_warned.insert(underlying.to_string()) {
            warn!(token = underlying, "no price data, using fallback price");
        }
        self.config
            .fallback_prices
            .get(underlying)
            .copied()
            .unwrap_or_else(|| default_price(underlying))
    }

    fn equity(&mut self) -> f64 {
        let held: Vec<(String, f64)> = self
            .state
            .positions
            .iter()
            .map(|(t, a)| (t.clone(), *a))
            .collect();
        let mut equity = self.state.capital;
        for (token, amount) in held {
            equity += amount * self.price(&token);
        }
        equity
    }

    fn trigger_fires(&mut self, id: &BlockId, kind: &TriggerKind) -> bool {
        match kind {
            TriggerKind::Schedule { interval_secs } => match self.state.last_fired.get(id) {
                None => true,
                Some(last) => (self.timestamp - *last).num_seconds() >= *interval_secs,
            },
            TriggerKind::Price {
                token,
                threshold,
                direction,
            } => {
                let price = self.price(token);
                let holds = direction.holds(price, *threshold);
                let held_before = self
                    .state
                    .price_condition
                    .insert(id.clone(), holds)
                    .unwrap_or(false);
                holds && !held_before
            }
            TriggerKind::Signal => false,
        }
    }

    fn available(&self, token: &str) -> f64 {
        if self.is_quote(token) {
            (self.state.capital - self.config.gas_cost_per_tx).max(0.0)
        } else {
            self.state.balance(token)
        }
    }

    fn pay_gas(&mut self) -> bool {
        let gas = self.config.gas_cost_per_tx;
        if self.state.capital < gas {
            return false;
        }
        self.state.capital -= gas;
        self.state.gas_spent += gas;
        true
    }

    fn execute<R: Rng + ?Sized>(&mut self, action: &PlannedAction, rng: &mut R) -> Option<Trade> {
        let id = &action.block_id;
        match &action.kind {
            ActionKind::Swap {
                from,
                to,
                amount,
                max_slippage,
            } => {
                let qty = amount.resolve(self.available(from));
                self.swap(id, TradeKind::Swap, from, to, qty, *max_slippage, rng)
            }
            ActionKind::Stake { token, amount } => self.stake(id, token, amount),
            ActionKind::Transfer { .. } | ActionKind::AddLiquidity { .. } => {
                self.pay_gas();
                None
            }
            ActionKind::Rebalance {
                token,
                target_percent,
                max_slippage,
            } => self.rebalance(id, token, *target_percent, *max_slippage, rng),
            ActionKind::Unsupported { .. } => None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn swap<R: Rng + ?Sized>(
        &mut self,
        id: &BlockId,
        kind: TradeKind,
        from: &str,
        to: &str,
        amount_in: f64,
        max_slippage: f64,
        rng: &mut R,
    ) -> Option<Trade> {
        let gas = self.config.gas_cost_per_tx;
        if from == to || amount_in <= 0.0 || self.state.capital < gas {
            return None;
        }
        let amount_in = amount_in.min(self.available(from));
        let from_price = self.price(from);
        let to_price = self.price(to);
        let value_in = amount_in * from_price;
        if amount_in <= 0.0 || value_in < self.config.min_trade_value {
            return None;
        }

        let cap = (max_slippage * self.config.slippage_multiplier).max(0.0);
        let slippage = if cap > 0.0 { rng.gen_range(0.0..=cap) } else { 0.0 };
        let value_out = value_in * (1.0 - slippage / 100.0);
        let amount_out = value_out / to_price;

        let released = if self.is_quote(from) {
            self.state.capital -= amount_in;
            value_in
        } else {
            self.state.debit(from, amount_in)
        };
        if self.is_quote(to) {
            self.state.capital += amount_out;
        } else {
            self.state.credit(to, amount_out, value_in);
        }
        self.pay_gas();

        let pnl = if self.is_quote(to) && !self.is_quote(from) {
            value_out - released - gas
        } else {
            -(value_in - value_out) - gas
        };

        Some(Trade {
            timestamp: self.timestamp,
            tick: self.tick,
            block_id: id.clone(),
            kind,
            from_token: from.to_string(),
            to_token: to.to_string(),
            amount_in,
            amount_out,
            price: from_price,
            slippage,
            gas,
            pnl,
        })
    }

    fn stake(&mut self, id: &BlockId, token: &str, amount: &AmountSpec) -> Option<Trade> {
        let gas = self.config.gas_cost_per_tx;
        if self.state.capital < gas {
            return None;
        }
        let qty = amount.resolve(self.available(token));
        let price = self.price(token);
        if qty <= 0.0 || qty * price < self.config.min_trade_value {
            return None;
        }
        let released = if self.is_quote(token) {
            self.state.capital -= qty;
            qty
        } else {
            self.state.debit(token, qty)
        };
        let bucket = staked_bucket(token);
        self.state.credit(&bucket, qty, released);
        self.pay_gas();

        Some(Trade {
            timestamp: self.timestamp,
            tick: self.tick,
            block_id: id.clone(),
            kind: TradeKind::Stake,
            from_token: token.to_string(),
            to_token: bucket,
            amount_in: qty,
            amount_out: qty,
            price,
            slippage: 0.0,
            gas,
            pnl: -gas,
        })
    }

    fn rebalance<R: Rng + ?Sized>(
        &mut self,
        id: &BlockId,
        token: &str,
        target_percent: f64,
        max_slippage: f64,
        rng: &mut R,
    ) -> Option<Trade> {
        if self.is_quote(token) {
            return None;
        }
        let equity = self.equity();
        let price = self.price(token);
        let current = self.state.balance(token) * price;
        let diff = equity * target_percent / 100.0 - current;
        if diff.abs() < self.config.min_trade_value {
            return None;
        }
        let quote = self.config.quote_token.clone();
        if diff > 0.0 {
            self.swap(id, TradeKind::Rebalance, &quote, token, diff, max_slippage, rng)
        } else {
            self.swap(id, TradeKind::Rebalance, token, &quote, -diff / price, max_slippage, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::hourly_timestamps;
    use crate::engine::plan::{AmountType, Direction, PlannedTrigger};
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn series(ton: &[f64]) -> PriceSeries {
        let ts = hourly_timestamps(start(), start() + Duration::hours(ton.len() as i64));
        let mut s = PriceSeries::new(ts);
        s.insert("TON", ton.to_vec());
        s
    }

    fn schedule(interval_secs: i64) -> PlannedTrigger {
        PlannedTrigger {
            block_id: BlockId::new("t"),
            kind: TriggerKind::Schedule { interval_secs },
        }
    }

    fn swap(from: &str, to: &str, kind: AmountType, value: f64) -> PlannedAction {
        PlannedAction {
            block_id: BlockId::new("x"),
            kind: ActionKind::Swap {
                from: from.into(),
                to: to.into(),
                amount: AmountSpec { kind, value },
                max_slippage: 0.0,
            },
        }
    }

    fn frictionless() -> EngineConfig {
        EngineConfig {
            gas_cost_per_tx: 0.0,
            ..EngineConfig::new(10_000.0)
        }
    }

    fn run(plan: &SimulationPlan, s: &PriceSeries, cfg: &EngineConfig) -> SimulationOutcome {
        run_simulation(plan, s, cfg, &mut StdRng::seed_from_u64(7), None)
    }

    #[test]
    fn hourly_schedule_fires_every_tick() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![swap("USDT", "TON", AmountType::Percentage, 50.0)],
        };
        let out = run(&plan, &series(&[5.0; 24]), &EngineConfig::new(10_000.0));
        assert_eq!(out.trigger_firings, 24);
        assert_eq!(out.equity_curve.len(), 24);
        assert!(out.trades.len() <= 24);
        assert!(!out.trades.is_empty());
    }

    #[test]
    fn two_hour_schedule_fires_every_other_tick() {
        let plan = SimulationPlan {
            triggers: vec![schedule(7200)],
            actions: vec![],
        };
        let out = run(&plan, &series(&[5.0; 24]), &frictionless());
        assert_eq!(out.trigger_firings, 12);
    }

    #[test]
    fn price_trigger_fires_on_crossing() {
        let plan = SimulationPlan {
            triggers: vec![PlannedTrigger {
                block_id: BlockId::new("p"),
                kind: TriggerKind::Price {
                    token: "TON".into(),
                    threshold: 5.0,
                    direction: Direction::Above,
                },
            }],
            actions: vec![],
        };
        let out = run(&plan, &series(&[4.0, 6.0, 6.0, 4.0, 6.0]), &frictionless());
        assert_eq!(out.trigger_firings, 2);
        let out = run(&plan, &series(&[6.0, 6.0]), &frictionless());
        assert_eq!(out.trigger_firings, 1);
    }

    #[test]
    fn flat_prices_without_friction_keep_equity_flat() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![swap("USDT", "TON", AmountType::Fixed, 100.0)],
        };
        let out = run(&plan, &series(&[5.0; 10]), &frictionless());
        assert_eq!(out.trades.len(), 10);
        for p in &out.equity_curve {
            assert!((p.equity - 10_000.0).abs() < 1e-6);
        }
        assert!(out.drawdown_curve.iter().all(|d| d.drawdown == 0.0));
        assert!((out.final_state.balance("TON") - 200.0).abs() < 1e-9);
    }

    #[test]
    fn selling_into_quote_realizes_pnl() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![
                swap("TON", "USDT", AmountType::All, 0.0),
                swap("USDT", "TON", AmountType::Fixed, 1000.0),
            ],
        };
        let out = run(&plan, &series(&[5.0, 10.0]), &frictionless());
        // Tick 0 buys 200 TON at 5; tick 1 sells them at 10.
        let sell = out
            .trades
            .iter()
            .find(|t| t.tick == 1 && t.to_token == "USDT")
            .unwrap();
        assert!((sell.pnl - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn gas_and_slippage_make_buys_negative() {
        let mut plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![swap("USDT", "TON", AmountType::Percentage, 10.0)],
        };
        if let ActionKind::Swap { max_slippage, .. } = &mut plan.actions[0].kind {
            *max_slippage = 1.0;
        }
        let out = run(&plan, &series(&[5.0; 5]), &EngineConfig::new(10_000.0));
        for t in &out.trades {
            assert!(t.pnl < 0.0);
            assert!(t.slippage >= 0.0 && t.slippage <= 1.0);
        }
        assert!(out.gas_spent > 0.0);
    }

    #[test]
    fn stake_moves_into_bucket_priced_by_underlying() {
        let plan = SimulationPlan {
            triggers: vec![schedule(86_400)],
            actions: vec![
                swap("USDT", "TON", AmountType::Fixed, 1000.0),
                PlannedAction {
                    block_id: BlockId::new("k"),
                    kind: ActionKind::Stake {
                        token: "TON".into(),
                        amount: AmountSpec {
                            kind: AmountType::All,
                            value: 0.0,
                        },
                    },
                },
            ],
        };
        let out = run(&plan, &series(&[5.0, 6.0]), &frictionless());
        assert_eq!(out.final_state.balance("TON"), 0.0);
        assert!((out.final_state.balance("staked_TON") - 200.0).abs() < 1e-9);
        assert!((out.equity_curve[1].equity - (9_000.0 + 200.0 * 6.0)).abs() < 1e-6);
    }

    #[test]
    fn missing_token_uses_fallback_price() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![swap("USDT", "BTC", AmountType::Fixed, 600.0)],
        };
        let out = run(&plan, &series(&[5.0; 3]), &frictionless());
        assert_eq!(out.fallback_tokens, vec!["BTC"]);
        assert!((out.trades[0].amount_out - 0.01).abs() < 1e-12);
    }

    #[test]
    fn cancellation_stops_before_first_tick() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![],
        };
        let flag = AtomicBool::new(true);
        let out = run_simulation(
            &plan,
            &series(&[5.0; 5]),
            &frictionless(),
            &mut StdRng::seed_from_u64(1),
            Some(&flag),
        );
        assert_eq!(out.terminated, Some(TerminationReason::Cancelled));
        assert!(out.equity_curve.is_empty());
    }

    #[test]
    fn zero_budget_times_out() {
        let plan = SimulationPlan::default();
        let cfg = EngineConfig {
            max_duration: Some(std::time::Duration::ZERO),
            ..frictionless()
        };
        let out = run(&plan, &series(&[5.0; 5]), &cfg);
        assert!(out.equity_curve.is_empty());
        assert_eq!(out.terminated, Some(TerminationReason::Timeout));
    }

    #[test]
    fn rebalance_moves_toward_target() {
        let plan = SimulationPlan {
            triggers: vec![schedule(3600)],
            actions: vec![PlannedAction {
                block_id: BlockId::new("r"),
                kind: ActionKind::Rebalance {
                    token: "TON".into(),
                    target_percent: 40.0,
                    max_slippage: 0.0,
                },
            }],
        };
        let out = run(&plan, &series(&[5.0, 5.0]), &frictionless());
        assert_eq!(out.trades.len(), 1);
        assert!((out.final_state.balance("TON") * 5.0 - 4_000.0).abs() < 1e-6);
    }
}
