//! The aligned, multi-asset time-series bundle `get_timeseries` returns
//! (spec §4.6): one shared date index plus one column per `(asset,
//! field)`, positionally aligned to that index. Column keys are kept as
//! `(String, String)` tuples rather than `MarketDataId` so the bundle has
//! no dependency on which subsystem constructed the request.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::canonical::ids::MarketDataId;
use crate::canonical::QualityFlag;
use crate::error::{HashError, PricingError};
use crate::pricing::market_data_view::{MarketDataView, MarketPoint};

use super::manifest::LineageMeta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    pub asset_id: String,
    pub provider_symbol: String,
}

/// Per-asset counts of the soft-quality outcomes the access service can
/// produce, plus the full flag set per `(asset, date)` for callers that
/// need more than a count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub missing_count: usize,
    pub duplicate_resolved_count: usize,
    pub suspect_corp_action_count: usize,
    pub outlier_return_count: usize,
    pub flags_by_asset: BTreeMap<String, BTreeSet<QualityFlag>>,
}

impl QualitySummary {
    pub fn flag(&mut self, asset: &str, flag: QualityFlag) {
        self.flags_by_asset
            .entry(asset.to_string())
            .or_default()
            .insert(flag);
        match flag {
            QualityFlag::MissingValue => self.missing_count += 1,
            QualityFlag::DuplicateResolved => self.duplicate_resolved_count += 1,
            QualityFlag::SuspectCorpAction => self.suspect_corp_action_count += 1,
            QualityFlag::OutlierReturn => self.outlier_return_count += 1,
            _ => {}
        }
    }
}

/// A thin, JSON-serializable snapshot of the bundle's content used only
/// to compute `bundle_hash` — tuple keys aren't valid JSON object keys,
/// so columns are flattened to `"asset::field"` strings here.
#[derive(Serialize)]
struct BundleHashView<'a> {
    date_index: &'a [NaiveDate],
    columns: BTreeMap<String, &'a [Option<f64>]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesBundle {
    pub date_index: Vec<NaiveDate>,
    pub columns: BTreeMap<(String, String), Vec<Option<f64>>>,
    pub assets_meta: Vec<AssetMeta>,
    pub quality: QualitySummary,
    pub lineage: LineageMeta,
}

impl TimeSeriesBundle {
    fn position(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.binary_search(&date).ok()
    }

    pub fn get(&self, asset: &str, field: &str, date: NaiveDate) -> Option<f64> {
        let pos = self.position(date)?;
        self.columns
            .get(&(asset.to_string(), field.to_string()))
            .and_then(|col| col.get(pos).copied().flatten())
    }

    /// Zips one column back onto the shared date index — the shape the
    /// risk engine's `AssetSeries.prices` expects, so building a
    /// `RiskInput` from a bundle is a `BTreeMap` lookup plus a zip.
    pub fn price_series(&self, asset: &str, field: &str) -> Vec<(NaiveDate, Option<f64>)> {
        let empty = Vec::new();
        let column = self
            .columns
            .get(&(asset.to_string(), field.to_string()))
            .unwrap_or(&empty);
        self.date_index
            .iter()
            .copied()
            .zip(column.iter().copied().chain(std::iter::repeat(None)))
            .collect()
    }

    /// Content hash of the bundle's aligned data, independent of
    /// lineage — two bundles covering the same numbers hash identically
    /// even if fetched at different wall-clock times.
    pub fn bundle_hash(&self) -> Result<String, HashError> {
        let columns = self
            .columns
            .iter()
            .map(|((asset, field), values)| (format!("{asset}::{field}"), values.as_slice()))
            .collect();
        crate::canonical::content_hash(&BundleHashView {
            date_index: &self.date_index,
            columns,
        })
    }
}

impl MarketDataView for TimeSeriesBundle {
    fn get_value(&self, asset: &MarketDataId, field: &str, as_of: NaiveDate) -> Result<f64, PricingError> {
        let key = asset.as_canonical_key();
        self.get(&key, field, as_of)
            .ok_or_else(|| PricingError::MissingPrice {
                asset: key,
                field: field.to_string(),
                as_of: as_of.to_string(),
            })
    }

    fn has_value(&self, asset: &MarketDataId, field: &str, as_of: NaiveDate) -> bool {
        self.get(&asset.as_canonical_key(), field, as_of).is_some()
    }

    fn get_point(&self, asset: &MarketDataId, field: &str, as_of: NaiveDate) -> Result<MarketPoint, PricingError> {
        let value = self.get_value(asset, field, as_of)?;
        let flags = self.quality.flags_by_asset.get(&asset.as_canonical_key()).cloned();
        Ok(MarketPoint { value, meta: flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lineage() -> LineageMeta {
        LineageMeta {
            provider: "fixture".to_string(),
            ingestion_ts_utc: Utc::now(),
            as_of_utc: None,
            dataset_version: None,
            code_version: None,
        }
    }

    fn bundle() -> TimeSeriesBundle {
        let dates = vec![
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        ];
        let mut columns = BTreeMap::new();
        columns.insert(
            ("AAPL@XNAS".to_string(), "close".to_string()),
            vec![Some(200.0), None],
        );
        TimeSeriesBundle {
            date_index: dates,
            columns,
            assets_meta: vec![AssetMeta {
                asset_id: "AAPL@XNAS".to_string(),
                provider_symbol: "AAPL.O".to_string(),
            }],
            quality: QualitySummary::default(),
            lineage: lineage(),
        }
    }

    #[test]
    fn get_returns_none_for_gap_and_value_for_present_date() {
        let b = bundle();
        assert_eq!(b.get("AAPL@XNAS", "close", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()), Some(200.0));
        assert_eq!(b.get("AAPL@XNAS", "close", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()), None);
    }

    #[test]
    fn market_data_view_errors_on_missing_price() {
        let b = bundle();
        let asset = MarketDataId::new("AAPL", Some("XNAS".to_string())).unwrap();
        assert!(b
            .get_value(&asset, "close", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
            .is_err());
        assert!(b
            .get_value(&asset, "close", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap())
            .is_ok());
    }

    #[test]
    fn bundle_hash_is_stable_across_equal_bundles() {
        assert_eq!(bundle().bundle_hash().unwrap(), bundle().bundle_hash().unwrap());
    }

    #[test]
    fn price_series_zips_column_onto_shared_date_index() {
        let b = bundle();
        let series = b.price_series("AAPL@XNAS", "close");
        assert_eq!(series, vec![
            (NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), Some(200.0)),
            (NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), None),
        ]);
    }
}
