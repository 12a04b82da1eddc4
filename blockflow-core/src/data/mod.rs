//! Price data: provider trait, synthetic market model, series alignment.

pub mod align;
pub mod provider;
pub mod series;
pub mod synthetic;

pub use align::{merge_series, AlignmentPolicy};
pub use provider::{DataError, MemoryPriceProvider, PriceDataProvider, PricePoint};
pub use series::{hourly_timestamps, PriceSeries};
pub use synthetic::{
    default_price, Level, LevelTable, MarketConditions, RegimeTables, SyntheticMarket, Trend,
    TrendTable, PRICE_FLOOR,
};
