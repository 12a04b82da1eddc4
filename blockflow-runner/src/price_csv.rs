//! CSV price provider — one `<TOKEN>.csv` file per token.
//!
//! Files have a `timestamp,price` header. Timestamps are RFC 3339 or unix
//! seconds; rows may be in any order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use blockflow_core::data::{DataError, PriceDataProvider, PricePoint};

#[derive(Debug, Deserialize)]
struct Row {
    timestamp: String,
    price: f64,
}

#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<TOKEN>.csv`. Symbols that could escape `dir` are refused.
    fn csv_path(&self, token: &str) -> Result<PathBuf, DataError> {
        if !is_plain_symbol(token) {
            return Err(DataError::Provider {
                token: token.to_string(),
                message: "token symbol is not a plain file name".into(),
            });
        }
        Ok(self.dir.join(format!("{token}.csv")))
    }

    /// Every row of the token's file, ascending by timestamp.
    fn load(&self, token: &str) -> Result<Vec<PricePoint>, DataError> {
        let path = self.csv_path(token)?;
        if !path.exists() {
            return Err(DataError::NotFound {
                token: token.to_string(),
            });
        }
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| provider_error(token, &path, e))?;

        let mut points = Vec::new();
        for (line, row) in rdr.deserialize::<Row>().enumerate() {
            let row = row.map_err(|e| provider_error(token, &path, e))?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
                DataError::Parse(format!(
                    "{}: row {}: invalid timestamp '{}'",
                    path.display(),
                    line + 1,
                    row.timestamp
                ))
            })?;
            points.push(PricePoint::new(timestamp, row.price));
        }
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

fn is_plain_symbol(token: &str) -> bool {
    !token.is_empty() && !token.contains(['/', '\\', ':']) && !token.contains("..")
}

fn provider_error(token: &str, path: &Path, e: csv::Error) -> DataError {
    DataError::Provider {
        token: token.to_string(),
        message: format!("{}: {e}", path.display()),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl PriceDataProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn get_historical_prices(
        &self,
        token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DataError> {
        Ok(self
            .load(token)?
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .collect())
    }

    fn get_current_price(&self, token: &str) -> Result<f64, DataError> {
        self.load(token)?
            .last()
            .map(|p| p.price)
            .ok_or_else(|| DataError::NotFound {
                token: token.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn provider_with(file: &str, contents: &str) -> (tempfile::TempDir, CsvPriceProvider) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file), contents).unwrap();
        let provider = CsvPriceProvider::new(dir.path());
        (dir, provider)
    }

    #[test]
    fn reads_rfc3339_and_unix_timestamps() {
        let (_dir, p) = provider_with(
            "TON.csv",
            "timestamp,price\n\
             2024-01-01T01:00:00Z,5.5\n\
             1704067200,5.0\n\
             2024-01-01T02:00:00+00:00,6.0\n",
        );
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let points = p.get_historical_prices("TON", start, end).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, start);
        assert_eq!(points[0].price, 5.0);
        assert_eq!(points[1].price, 5.5);
        assert_eq!(p.get_current_price("TON").unwrap(), 6.0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, p) = provider_with("TON.csv", "timestamp,price\n");
        assert!(matches!(
            p.get_current_price("BTC"),
            Err(DataError::NotFound { .. })
        ));
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let (_dir, p) = provider_with("TON.csv", "timestamp,price\nyesterday,5.0\n");
        let err = p.get_current_price("TON").unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn symbols_cannot_leave_the_data_dir() {
        let outer = tempfile::tempdir().unwrap();
        let inner = outer.path().join("prices");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(outer.path().join("x.csv"), "timestamp,price\n1704067200,5.0\n").unwrap();
        let p = CsvPriceProvider::new(&inner);
        for token in ["../x", "..", "a/b", "a\\b", ""] {
            assert!(
                matches!(p.get_current_price(token), Err(DataError::Provider { .. })),
                "{token}"
            );
        }
    }

    #[test]
    fn bad_price_is_a_provider_error() {
        let (_dir, p) = provider_with("TON.csv", "timestamp,price\n1704067200,cheap\n");
        assert!(matches!(
            p.get_current_price("TON"),
            Err(DataError::Provider { .. })
        ));
    }
}
