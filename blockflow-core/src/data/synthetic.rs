//! Synthetic market: regime tables and the multiplicative random walk.
//!
//! `price[t+1] = max(FLOOR, price[t] * (1 + drift + U(-1, 1) * volatility))`

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::series::PriceSeries;

/// Lowest price a synthetic walk may reach.
pub const PRICE_FLOOR: f64 = 1e-6;

/// Starting price for tokens with no configured initial price.
pub fn default_price(token: &str) -> f64 {
    match token {
        "TON" => 5.0,
        "NOT" => 0.01,
        "STON" => 3.0,
        "BTC" => 60_000.0,
        "ETH" => 3_000.0,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bull,
    Bear,
    #[default]
    Sideways,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Bull, Trend::Bear, Trend::Sideways];
}

/// One market regime: volatility level, trend and liquidity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketConditions {
    pub volatility: Level,
    pub trend: Trend,
    pub liquidity: Level,
}

impl MarketConditions {
    /// Draw each component independently and uniformly.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            volatility: Level::ALL[rng.gen_range(0..Level::ALL.len())],
            trend: Trend::ALL[rng.gen_range(0..Trend::ALL.len())],
            liquidity: Level::ALL[rng.gen_range(0..Level::ALL.len())],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl LevelTable {
    pub fn get(&self, level: Level) -> f64 {
        match level {
            Level::Low => self.low,
            Level::Medium => self.medium,
            Level::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendTable {
    pub bull: f64,
    pub bear: f64,
    pub sideways: f64,
}

impl TrendTable {
    pub fn get(&self, trend: Trend) -> f64 {
        match trend {
            Trend::Bull => self.bull,
            Trend::Bear => self.bear,
            Trend::Sideways => self.sideways,
        }
    }
}

/// Per-tick volatility and drift by regime, and the slippage multiplier by
/// liquidity (a fraction of the configured maximum slippage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeTables {
    pub volatility: LevelTable,
    pub drift: TrendTable,
    pub slippage_multiplier: LevelTable,
}

impl Default for RegimeTables {
    fn default() -> Self {
        Self {
            volatility: LevelTable {
                low: 0.005,
                medium: 0.015,
                high: 0.04,
            },
            drift: TrendTable {
                bull: 0.0008,
                bear: -0.0008,
                sideways: 0.0,
            },
            slippage_multiplier: LevelTable {
                low: 1.0,
                medium: 0.6,
                high: 0.3,
            },
        }
    }
}

/// A regime resolved against its tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticMarket {
    pub conditions: MarketConditions,
    pub volatility: f64,
    pub drift: f64,
    pub slippage_multiplier: f64,
}

impl SyntheticMarket {
    pub fn new(conditions: MarketConditions, tables: &RegimeTables) -> Self {
        Self {
            conditions,
            volatility: tables.volatility.get(conditions.volatility),
            drift: tables.drift.get(conditions.trend),
            slippage_multiplier: tables.slippage_multiplier.get(conditions.liquidity),
        }
    }

    /// `steps` prices starting at `start`.
    pub fn walk<R: Rng + ?Sized>(&self, start: f64, steps: usize, rng: &mut R) -> Vec<f64> {
        let mut prices = Vec::with_capacity(steps);
        let mut price = start.max(PRICE_FLOOR);
        for _ in 0..steps {
            prices.push(price);
            let shock: f64 = rng.gen_range(-1.0..=1.0);
            price = (price * (1.0 + self.drift + shock * self.volatility)).max(PRICE_FLOOR);
        }
        prices
    }

    /// One independent walk per token on the given timeline. `rng_for` supplies
    /// each token's generator so draws do not depend on token order.
    pub fn series<R, F>(
        &self,
        tokens: &[String],
        timestamps: Vec<DateTime<Utc>>,
        initial_prices: &BTreeMap<String, f64>,
        mut rng_for: F,
    ) -> PriceSeries
    where
        R: Rng,
        F: FnMut(&str) -> R,
    {
        let steps = timestamps.len();
        let mut series = PriceSeries::new(timestamps);
        for token in tokens {
            let start = initial_prices
                .get(token)
                .copied()
                .unwrap_or_else(|| default_price(token));
            let mut rng = rng_for(token);
            series.insert(token, self.walk(start, steps, &mut rng));
        }
        series
    }
}
