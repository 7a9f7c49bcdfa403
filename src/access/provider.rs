//! Provider boundary for the access service (spec §4.6 step 4). Distinct
//! from [`crate::ingestion::provider::ProviderAdapter`]: ingestion moves
//! raw bytes into canonical storage for later reuse, while this trait
//! returns an already-parsed, already-deduplicated-by-nothing series for
//! one `(symbol, field)` pair — the access service does its own
//! duplicate/missing-data handling downstream.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::AccessError;

/// A provider-native observation before any reindexing or policy has
/// been applied: a bare `(date, value)` pair, duplicates and gaps
/// included as the provider actually returned them.
pub type RawPoint = (NaiveDate, f64);

pub trait MarketDataProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn fetch_series(
        &self,
        provider_symbol: &str,
        field: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPoint>, AccessError>;
}

/// In-memory fixture provider keyed by `(provider_symbol, field)`, for
/// deterministic tests and local development. Points outside `[start,
/// end]` are filtered out; points are returned in whatever order they
/// were inserted, so callers exercising duplicate-discipline can control
/// which observation arrives first.
#[derive(Debug, Clone, Default)]
pub struct FixtureMarketDataProvider {
    series: BTreeMap<(String, String), Vec<RawPoint>>,
}

impl FixtureMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(
        mut self,
        provider_symbol: impl Into<String>,
        field: impl Into<String>,
        points: Vec<RawPoint>,
    ) -> Self {
        self.series.insert((provider_symbol.into(), field.into()), points);
        self
    }
}

impl MarketDataProvider for FixtureMarketDataProvider {
    fn provider_id(&self) -> &str {
        "fixture"
    }

    async fn fetch_series(
        &self,
        provider_symbol: &str,
        field: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPoint>, AccessError> {
        let key = (provider_symbol.to_string(), field.to_string());
        let points = self.series.get(&key).cloned().unwrap_or_default();
        Ok(points
            .into_iter()
            .filter(|(date, _)| *date >= start && *date <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_provider_filters_to_requested_window() {
        let provider = FixtureMarketDataProvider::new().with_series(
            "AAPL.O",
            "close",
            vec![
                (NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), 200.0),
                (NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(), 210.0),
            ],
        );
        let points = provider
            .fetch_series(
                "AAPL.O",
                "close",
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1, 200.0);
    }

    #[tokio::test]
    async fn unknown_symbol_returns_empty_series_not_an_error() {
        let provider = FixtureMarketDataProvider::new();
        let points = provider
            .fetch_series(
                "NOPE",
                "close",
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            )
            .await
            .unwrap();
        assert!(points.is_empty());
    }
}
