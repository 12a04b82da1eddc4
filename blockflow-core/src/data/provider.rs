//! Price-data provider trait and structured error types.
//!
//! The simulator only ever talks to `PriceDataProvider`, so file-backed,
//! in-memory and (externally) network-backed sources are interchangeable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One historical observation of a token price in quote units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data for token '{token}'")]
    NotFound { token: String },

    #[error("provider error for '{token}': {message}")]
    Provider { token: String, message: String },

    #[error("malformed price data: {0}")]
    Parse(String),

    #[error("price series are misaligned: {0}")]
    Misaligned(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of historical and current token prices.
pub trait PriceDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Prices for `token` with `start <= timestamp < end`, ascending.
    fn get_historical_prices(
        &self,
        token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DataError>;

    fn get_current_price(&self, token: &str) -> Result<f64, DataError>;
}

/// Provider over prices held in memory. Handy for tests and for callers that
/// already fetched their data.
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceProvider {
    series: HashMap<String, Vec<PricePoint>>,
}

impl MemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, token: &str, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        self.series.insert(token.to_string(), points);
        self
    }
}

impl PriceDataProvider for MemoryPriceProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_historical_prices(
        &self,
        token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DataError> {
        let points = self.series.get(token).ok_or_else(|| DataError::NotFound {
            token: token.to_string(),
        })?;
        Ok(points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .copied()
            .collect())
    }

    fn get_current_price(&self, token: &str) -> Result<f64, DataError> {
        self.series
            .get(token)
            .and_then(|points| points.last())
            .map(|p| p.price)
            .ok_or_else(|| DataError::NotFound {
                token: token.to_string(),
            })
    }
}
