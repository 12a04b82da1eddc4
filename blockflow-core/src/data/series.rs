//! Multi-token price series on a shared timeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Aligned prices: every token's vector has the same length as `timestamps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub prices: BTreeMap<String, Vec<f64>>,
}

impl PriceSeries {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            prices: BTreeMap::new(),
        }
    }

    /// Attach a token's prices. Lengths must match the timeline.
    pub fn insert(&mut self, token: &str, prices: Vec<f64>) {
        debug_assert_eq!(prices.len(), self.timestamps.len());
        self.prices.insert(token.to_string(), prices);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// Price of `token` at tick `index`, if the series carries that token.
    pub fn price(&self, token: &str, index: usize) -> Option<f64> {
        self.prices
            .get(token)
            .and_then(|p| p.get(index))
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Hourly ticks in `[start, end)`.
pub fn hourly_timestamps(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut t = start;
    while t < end {
        out.push(t);
        t += Duration::hours(1);
    }
    out
}
