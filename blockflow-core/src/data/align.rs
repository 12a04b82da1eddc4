//! Merging per-token histories onto one timeline.
//!
//! `ByIndex` zips series by position and takes the timeline of the longest
//! one; shorter series are padded with their last price. It never fails, and
//! series with different cadences silently misalign. `Strict` refuses to
//! merge unless every series has the same timestamps.

use serde::{Deserialize, Serialize};

use super::provider::{DataError, PricePoint};
use super::series::PriceSeries;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    #[default]
    ByIndex,
    Strict,
}

pub fn merge_series(
    histories: Vec<(String, Vec<PricePoint>)>,
    policy: AlignmentPolicy,
) -> Result<PriceSeries, DataError> {
    match policy {
        AlignmentPolicy::ByIndex => Ok(merge_by_index(histories)),
        AlignmentPolicy::Strict => merge_strict(histories),
    }
}

fn merge_by_index(histories: Vec<(String, Vec<PricePoint>)>) -> PriceSeries {
    let Some((_, longest)) = histories.iter().max_by_key(|(_, points)| points.len()) else {
        return PriceSeries::default();
    };
    let len = longest.len();
    let mut series = PriceSeries::new(longest.iter().map(|p| p.timestamp).collect());

    for (token, points) in histories {
        let Some(last) = points.last().map(|p| p.price) else {
            // No data at all; callers fall back to a default price.
            continue;
        };
        let mut prices: Vec<f64> = points.iter().map(|p| p.price).collect();
        prices.resize(len, last);
        series.insert(&token, prices);
    }
    series
}

fn merge_strict(histories: Vec<(String, Vec<PricePoint>)>) -> Result<PriceSeries, DataError> {
    let Some((first_token, first)) = histories.first() else {
        return Ok(PriceSeries::default());
    };
    let first_token = first_token.clone();
    let timeline: Vec<_> = first.iter().map(|p| p.timestamp).collect();

    for (token, points) in &histories {
        if points.len() != timeline.len() {
            return Err(DataError::Misaligned(format!(
                "'{token}' has {} points, '{first_token}' has {}",
                points.len(),
                timeline.len()
            )));
        }
        if let Some((i, p)) = points
            .iter()
            .enumerate()
            .find(|(i, p)| p.timestamp != timeline[*i])
        {
            return Err(DataError::Misaligned(format!(
                "'{token}' tick {i} is at {}, '{first_token}' tick {i} is at {}",
                p.timestamp, timeline[i]
            )));
        }
    }

    let mut series = PriceSeries::new(timeline);
    for (token, points) in histories {
        series.insert(&token, points.iter().map(|p| p.price).collect());
    }
    Ok(series)
}
