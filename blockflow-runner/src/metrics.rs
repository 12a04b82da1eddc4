//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar
//! out. Returns and drawdowns are in percent; win rate is a fraction.
//! Annualization assumes 365 periods a year (crypto markets never close).

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use blockflow_core::engine::{EquityPoint, Trade};

const PERIODS_PER_YEAR: f64 = 365.0;

/// Return of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    /// Percent, from the month's first to its last equity sample.
    pub return_pct: f64,
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    /// Annualized population standard deviation of per-tick returns.
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Infinite when there are profits and no losses; serialized as `null`.
    #[serde(serialize_with = "ser_ratio", deserialize_with = "de_ratio")]
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_trade_pnl: f64,
    pub total_gas: f64,
    pub monthly_returns: Vec<MonthlyReturn>,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    ///
    /// `period_days` is the length of the simulated period and drives
    /// annualization; `risk_free_rate` is annual, as a fraction.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_capital: f64,
        period_days: f64,
        risk_free_rate: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let final_equity = equity.last().copied().unwrap_or(initial_capital);
        let total = total_return(initial_capital, final_equity);
        let returns = tick_returns(&equity);
        let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = trades.iter().filter(|t| t.pnl < 0.0).count();

        Self {
            total_return: total,
            annualized_return: annualized_return(total, period_days),
            volatility: volatility(&returns),
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
            sortino_ratio: sortino_ratio(&returns, risk_free_rate),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            total_trades: trades.len(),
            winning_trades,
            losing_trades,
            avg_trade_pnl: if trades.is_empty() {
                0.0
            } else {
                trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64
            },
            total_gas: trades.iter().map(|t| t.gas).sum(),
            monthly_returns: monthly_returns(equity_curve),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return in percent.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial * 100.0
}

/// `((1 + R)^(365 / days) - 1)` in percent, where `R` is the total return.
pub fn annualized_return(total_return_pct: f64, period_days: f64) -> f64 {
    if period_days <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return_pct / 100.0;
    if growth <= 0.0 {
        return -100.0;
    }
    (growth.powf(PERIODS_PER_YEAR / period_days) - 1.0) * 100.0
}

/// Simple returns between consecutive equity samples.
pub fn tick_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Population standard deviation of per-tick returns, annualized by √365.
pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * PERIODS_PER_YEAR.sqrt()
}

/// `(mean - rf/365) / std * √365`; 0 when the returns do not vary.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean(returns) - risk_free_rate / PERIODS_PER_YEAR) / std * PERIODS_PER_YEAR.sqrt()
}

/// Like Sharpe, with the standard deviation of negative returns only.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let downside_std = std_dev(&downside);
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean(returns) - risk_free_rate / PERIODS_PER_YEAR) / downside_std * PERIODS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline in percent, in `[0, 100]`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak * 100.0);
        }
    }
    max_dd.clamp(0.0, 100.0)
}

/// Fraction of trades with positive pnl.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.pnl > 0.0).count() as f64 / trades.len() as f64
}

/// Gross profit / |gross loss|. Infinite with profits and no losses, 0 with neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).sum();
    let gross_loss: f64 = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).sum::<f64>().abs();
    if gross_loss < 1e-12 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Returns bucketed by (year, month), each from its first and last sample.
pub fn monthly_returns(curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut out: Vec<MonthlyReturn> = Vec::new();
    let mut bucket: Option<((i32, u32), f64, f64)> = None;

    fn flush(key: (i32, u32), first: f64, last: f64, out: &mut Vec<MonthlyReturn>) {
        out.push(MonthlyReturn {
            year: key.0,
            month: key.1,
            return_pct: total_return(first, last),
        });
    }

    for point in curve {
        let key = (point.timestamp.year(), point.timestamp.month());
        bucket = match bucket {
            Some((k, first, _)) if k == key => Some((k, first, point.equity)),
            Some((k, first, last)) => {
                flush(k, first, last, &mut out);
                Some((key, point.equity, point.equity))
            }
            None => Some((key, point.equity, point.equity)),
        };
    }
    if let Some((k, first, last)) = bucket {
        flush(k, first, last, &mut out);
    }
    out
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn ser_ratio<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        s.serialize_some(value)
    } else {
        s.serialize_none()
    }
}

fn de_ratio<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
}
