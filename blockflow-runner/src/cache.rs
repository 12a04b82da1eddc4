//! In-process backtest result cache.
//!
//! Keyed by `(strategy id, version, period start, period end)`. Bounded with
//! FIFO eviction; clones share the same storage. Concurrent misses on the same
//! key both compute, and the later insert wins.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use blockflow_core::domain::{Strategy, StrategyId};

use crate::runner::BacktestResult;

pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub strategy_id: StrategyId,
    pub version: u32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl CacheKey {
    pub fn new(strategy: &Strategy, period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            strategy_id: strategy.id.clone(),
            version: strategy.version,
            period_start,
            period_end,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Arc<BacktestResult>>,
    order: VecDeque<CacheKey>,
}

#[derive(Debug, Clone)]
pub struct BacktestCache {
    inner: Arc<RwLock<Inner>>,
    max_entries: Option<usize>,
}

impl Default for BacktestCache {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_ENTRIES))
    }
}

impl BacktestCache {
    /// `None` means unbounded.
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            max_entries,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<BacktestResult>> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, result: Arc<BacktestResult>) {
        let mut inner = self.inner.write();
        if inner.entries.insert(key.clone(), result).is_some() {
            warn!(strategy = %key.strategy_id, "cache entry overwritten by a concurrent run");
            return;
        }
        inner.order.push_back(key);
        if let Some(max) = self.max_entries {
            while inner.entries.len() > max {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                debug!(strategy = %oldest.strategy_id, "evicted cached backtest");
            }
        }
    }

    /// Drop every entry for `strategy_id`. Returns how many were removed.
    pub fn invalidate(&self, strategy_id: &StrategyId) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|k, _| &k.strategy_id != strategy_id);
        inner.order.retain(|k| &k.strategy_id != strategy_id);
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
