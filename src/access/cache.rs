//! Per-asset parquet cache and manifest store (spec §6), laid out at:
//!
//! ```text
//! <root>/market/<provider>/<asset>/1D/part-<year>.parquet
//! <root>/manifests/<request_hash>.json
//! ```
//!
//! Writes are stage-then-rename, the same pattern
//! [`crate::storage::canonical_zone::CanonicalZone::publish`] uses: a
//! reader never observes a half-written parquet or manifest file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::error::AccessError;

use super::manifest::Manifest;

pub struct MarketCache {
    root: PathBuf,
}

impl MarketCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn asset_dir(&self, provider: &str, asset: &str) -> PathBuf {
        self.root.join("market").join(provider).join(asset).join("1D")
    }

    fn parquet_path(&self, provider: &str, asset: &str, year: i32) -> PathBuf {
        self.asset_dir(provider, asset).join(format!("part-{year}.parquet"))
    }

    fn manifest_path(&self, request_hash: &str) -> PathBuf {
        self.root.join("manifests").join(format!("{request_hash}.json"))
    }

    fn io_err(path: &std::path::Path, detail: impl ToString) -> AccessError {
        AccessError::CacheIo {
            path: path.display().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Writes one asset's `(date, field -> value)` rows, partitioned by
    /// calendar year, into the per-asset parquet store. Existing years not
    /// covered by `rows` are left untouched.
    #[tracing::instrument(skip(self, rows))]
    pub fn write_asset(
        &self,
        provider: &str,
        asset: &str,
        fields: &[String],
        dates: &[NaiveDate],
        rows: &BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Vec<PathBuf>, AccessError> {
        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, date) in dates.iter().enumerate() {
            by_year.entry(date.year()).or_default().push(i);
        }

        let dir = self.asset_dir(provider, asset);
        std::fs::create_dir_all(&dir).map_err(|e| Self::io_err(&dir, e))?;

        let mut written = Vec::new();
        for (year, indices) in by_year {
            let year_dates: Vec<i32> = indices
                .iter()
                .map(|&i| (dates[i] - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32)
                .collect();

            let mut columns: Vec<Column> = vec![Series::new("date".into(), year_dates)
                .cast(&DataType::Date)
                .map_err(|e| Self::io_err(&dir, e))?
                .into()];

            for field in fields {
                let values: Vec<Option<f64>> = indices
                    .iter()
                    .map(|&i| rows.get(field).and_then(|v| v.get(i).copied().flatten()))
                    .collect();
                columns.push(Series::new(field.into(), values).into());
            }

            let mut df = DataFrame::new(columns).map_err(|e| Self::io_err(&dir, e))?;

            let final_path = self.parquet_path(provider, asset, year);
            let tmp_path = final_path.with_extension("parquet.tmp");
            let mut file = std::fs::File::create(&tmp_path).map_err(|e| Self::io_err(&tmp_path, e))?;
            ParquetWriter::new(&mut file)
                .finish(&mut df)
                .map_err(|e| Self::io_err(&tmp_path, e))?;
            std::fs::rename(&tmp_path, &final_path).map_err(|e| Self::io_err(&final_path, e))?;
            written.push(final_path);
        }
        Ok(written)
    }

    /// Reads one asset's cached rows back for `[start, end]`, spanning
    /// whichever yearly partitions overlap the range. Returns the date
    /// column plus one `Vec<Option<f64>>` per requested field, all
    /// positionally aligned — the shape [`TimeSeriesBundle`] expects.
    #[tracing::instrument(skip(self))]
    pub fn read_asset(
        &self,
        provider: &str,
        asset: &str,
        fields: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<NaiveDate>, BTreeMap<String, Vec<Option<f64>>>), AccessError> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let mut dates = Vec::new();
        let mut columns: BTreeMap<String, Vec<Option<f64>>> = fields.iter().map(|f| (f.clone(), Vec::new())).collect();

        for year in start.year()..=end.year() {
            let path = self.parquet_path(provider, asset, year);
            if !path.exists() {
                continue;
            }
            let file = std::fs::File::open(&path).map_err(|e| Self::io_err(&path, e))?;
            let df = ParquetReader::new(file).finish().map_err(|e| Self::io_err(&path, e))?;

            let date_col = df.column("date").map_err(|e| Self::io_err(&path, e))?;
            let date_days = date_col.cast(&DataType::Int32).map_err(|e| Self::io_err(&path, e))?;
            let date_ca = date_days.i32().map_err(|e| Self::io_err(&path, e))?;

            for (row, days) in date_ca.into_iter().enumerate() {
                let Some(days) = days else { continue };
                let date = epoch + chrono::Duration::days(days as i64);
                if date < start || date > end {
                    continue;
                }
                dates.push(date);
                for field in fields {
                    let value = df
                        .column(field)
                        .ok()
                        .and_then(|c| c.f64().ok().and_then(|ca| ca.get(row)));
                    columns.get_mut(field).unwrap().push(value);
                }
            }
        }
        Ok((dates, columns))
    }

    pub fn read_manifest(&self, request_hash: &str) -> Result<Option<Manifest>, AccessError> {
        let path = self.manifest_path(request_hash);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| Self::io_err(&path, e))?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| AccessError::ManifestCorrupt {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(Some(manifest))
    }

    #[tracing::instrument(skip(self, manifest))]
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf, AccessError> {
        let final_path = self.manifest_path(&manifest.request_hash);
        let tmp_path = final_path.with_extension("json.tmp");
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::io_err(&final_path, e))?;
        }
        let body = serde_json::to_string_pretty(manifest).map_err(|e| Self::io_err(&final_path, e))?;
        std::fs::write(&tmp_path, body).map_err(|e| Self::io_err(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| Self::io_err(&final_path, e))?;
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_asset_produces_one_parquet_file_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        let dates = vec![
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        ];
        let mut rows = BTreeMap::new();
        rows.insert("close".to_string(), vec![Some(100.0), Some(101.0)]);
        let written = cache
            .write_asset("fixture", "AAPL@XNAS", &["close".to_string()], &dates, &rows)
            .unwrap();
        assert_eq!(written.len(), 2);
        for path in &written {
            assert!(path.exists());
            assert!(!path.with_extension("parquet.tmp").exists());
        }
    }

    #[test]
    fn manifest_round_trips_through_write_and_read() {
        use super::super::bundle::QualitySummary;
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        let manifest = Manifest {
            request_json: serde_json::json!({"assets": ["AAPL@XNAS"]}),
            request_hash: "abc123".to_string(),
            provider: "fixture".to_string(),
            ingestion_ts_utc: chrono::Utc::now(),
            as_of_utc: None,
            dataset_version: None,
            code_version: None,
            storage_paths: vec![],
            quality_summary: QualitySummary::default(),
        };
        cache.write_manifest(&manifest).unwrap();
        let loaded = cache.read_manifest("abc123").unwrap().unwrap();
        assert_eq!(loaded.request_hash, "abc123");
    }

    #[test]
    fn missing_manifest_is_none_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        assert!(cache.read_manifest("nope").unwrap().is_none());
    }
}
