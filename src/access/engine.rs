//! `AccessService::get_timeseries` (spec §4.6): the cache-hash -> fetch ->
//! align -> validate -> guardrail -> persist pipeline that turns a
//! [`TimeSeriesRequest`] into an aligned [`TimeSeriesBundle`], replaying
//! an identical prior request from the manifest cache with no provider
//! call.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};

use crate::canonical::calendar::VenueCalendar;
use crate::canonical::record::QualityFlag;
use crate::error::AccessError;

use super::bundle::{AssetMeta, QualitySummary, TimeSeriesBundle};
use super::cache::MarketCache;
use super::manifest::{LineageMeta, Manifest};
use super::provider::MarketDataProvider;
use super::request::{DuplicateDiscipline, MissingDataPolicy, TimeSeriesRequest};
use super::symbol_mapper::SymbolMapper;

pub struct AccessService<'a> {
    pub cache: &'a MarketCache,
    pub symbol_mapper: &'a dyn SymbolMapper,
    pub provider: &'a dyn MarketDataProvider,
    pub calendar: &'a VenueCalendar,
    pub code_version: Option<&'a str>,
}

/// Dedupes a provider's raw `(date, value)` series under
/// `discipline`, returning one value per date plus a count of how many
/// duplicate observations were resolved away.
fn dedupe(
    asset: &str,
    points: Vec<(NaiveDate, f64)>,
    discipline: DuplicateDiscipline,
) -> Result<(BTreeMap<NaiveDate, f64>, usize), AccessError> {
    let mut seen: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut duplicates = 0usize;
    for (date, value) in points {
        match seen.get(&date) {
            None => {
                seen.insert(date, value);
            }
            Some(_) => {
                duplicates += 1;
                match discipline {
                    DuplicateDiscipline::Last => {
                        seen.insert(date, value);
                    }
                    DuplicateDiscipline::First => {}
                    DuplicateDiscipline::Error => {
                        return Err(AccessError::UnresolvedDuplicate {
                            asset: asset.to_string(),
                            date: date.to_string(),
                        });
                    }
                }
            }
        }
    }
    Ok((seen, duplicates))
}

impl AccessService<'_> {
    #[tracing::instrument(skip(self, request))]
    pub async fn get_timeseries(&self, request: &TimeSeriesRequest) -> Result<TimeSeriesBundle, AccessError> {
        let request_hash = request.request_hash().map_err(|e| AccessError::ManifestCorrupt {
            path: "<request>".to_string(),
            detail: e.to_string(),
        })?;

        if let Some(manifest) = self.cache.read_manifest(&request_hash)? {
            tracing::info!(request_hash = %request_hash, "cache hit, replaying bundle without a provider call");
            return self.replay_cached_bundle(request, manifest);
        }

        let target_index = self.calendar.sessions(request.start, request.end);
        if target_index.is_empty() {
            return Err(AccessError::ManifestCorrupt {
                path: "<calendar>".to_string(),
                detail: format!(
                    "calendar '{}' has no trading sessions between {} and {}",
                    request.calendar, request.start, request.end
                ),
            });
        }

        let mut columns: BTreeMap<(String, String), Vec<Option<f64>>> = BTreeMap::new();
        let mut assets_meta = Vec::new();
        let mut quality = QualitySummary::default();

        for asset in &request.assets {
            let provider_symbol = self.symbol_mapper.provider_symbol(asset)?;
            for field in &request.fields {
                let raw = self
                    .provider
                    .fetch_series(&provider_symbol, field, request.start, request.end)
                    .await?;

                let (by_date, duplicate_count) =
                    dedupe(asset, raw, request.validation_policy.duplicate_discipline)?;
                for _ in 0..duplicate_count {
                    quality.flag(asset, QualityFlag::DuplicateResolved);
                }

                let mut column = Vec::with_capacity(target_index.len());
                for date in &target_index {
                    match by_date.get(date) {
                        Some(&value) => {
                            if request.validation_policy.reject_nonpositive_prices && value <= 0.0 {
                                return Err(AccessError::NonPositivePrice {
                                    asset: asset.clone(),
                                    date: date.to_string(),
                                    value,
                                });
                            }
                            column.push(Some(value));
                        }
                        None => {
                            if request.missing_data_policy == MissingDataPolicy::Error {
                                return Err(AccessError::MissingRequiredField {
                                    asset: asset.clone(),
                                    date: date.to_string(),
                                });
                            }
                            quality.flag(asset, QualityFlag::MissingValue);
                            column.push(None);
                        }
                    }
                }
                columns.insert((asset.clone(), field.clone()), column);
            }
            assets_meta.push(AssetMeta {
                asset_id: asset.clone(),
                provider_symbol,
            });
        }

        apply_guardrails(&request.assets, &request.guardrails, &mut columns, &mut quality);

        let (final_index, final_columns) = match request.missing_data_policy {
            MissingDataPolicy::DropDates => drop_incomplete_dates(target_index, columns),
            MissingDataPolicy::NanOk | MissingDataPolicy::Error => (target_index, columns),
        };

        let lineage = LineageMeta {
            provider: self.provider.provider_id().to_string(),
            ingestion_ts_utc: Utc::now(),
            as_of_utc: request.as_of,
            dataset_version: None,
            code_version: self.code_version.map(String::from),
        };

        let mut storage_paths = Vec::new();
        for asset in &request.assets {
            let rows: BTreeMap<String, Vec<Option<f64>>> = request
                .fields
                .iter()
                .map(|field| {
                    let values = final_columns
                        .get(&(asset.clone(), field.clone()))
                        .cloned()
                        .unwrap_or_default();
                    (field.clone(), values)
                })
                .collect();
            let written = self
                .cache
                .write_asset(&lineage.provider, asset, &request.fields, &final_index, &rows)?;
            storage_paths.extend(written.into_iter().map(|p| p.display().to_string()));
        }

        let manifest = Manifest {
            request_json: serde_json::to_value(request).map_err(|e| AccessError::ManifestCorrupt {
                path: "<request>".to_string(),
                detail: e.to_string(),
            })?,
            request_hash: request_hash.clone(),
            provider: lineage.provider.clone(),
            ingestion_ts_utc: lineage.ingestion_ts_utc,
            as_of_utc: lineage.as_of_utc,
            dataset_version: lineage.dataset_version.clone(),
            code_version: lineage.code_version.clone(),
            storage_paths,
            quality_summary: quality.clone(),
        };
        self.cache.write_manifest(&manifest)?;

        Ok(TimeSeriesBundle {
            date_index: final_index,
            columns: final_columns,
            assets_meta,
            quality,
            lineage,
        })
    }

    /// Rebuilds a bundle from a manifest hit. The manifest's
    /// `storage_paths` are the authority on what was actually persisted;
    /// this reads the per-asset parquet back rather than re-deriving
    /// anything from the request.
    fn replay_cached_bundle(
        &self,
        request: &TimeSeriesRequest,
        manifest: Manifest,
    ) -> Result<TimeSeriesBundle, AccessError> {
        let mut columns = BTreeMap::new();
        let mut assets_meta = Vec::new();
        let mut date_index = Vec::new();
        for asset in &request.assets {
            let provider_symbol = self
                .symbol_mapper
                .provider_symbol(asset)
                .unwrap_or_else(|_| asset.clone());
            let (dates, fields) =
                self.cache
                    .read_asset(&manifest.provider, asset, &request.fields, request.start, request.end)?;
            if dates.len() > date_index.len() {
                date_index = dates;
            }
            for (field, values) in fields {
                columns.insert((asset.clone(), field), values);
            }
            assets_meta.push(AssetMeta {
                asset_id: asset.clone(),
                provider_symbol,
            });
        }

        let lineage = LineageMeta {
            provider: manifest.provider.clone(),
            ingestion_ts_utc: manifest.ingestion_ts_utc,
            as_of_utc: manifest.as_of_utc,
            dataset_version: manifest.dataset_version.clone(),
            code_version: manifest.code_version.clone(),
        };

        Ok(TimeSeriesBundle {
            date_index,
            columns,
            assets_meta,
            quality: manifest.quality_summary,
            lineage,
        })
    }
}

/// Flags, without correcting, single-period jumps beyond the configured
/// thresholds (spec §4.6 step 5). Runs on the `close` field only, mirroring
/// the ingestion validator's own corporate-action check.
fn apply_guardrails(
    assets: &[String],
    guardrails: &super::request::GuardrailPolicy,
    columns: &mut BTreeMap<(String, String), Vec<Option<f64>>>,
    quality: &mut QualitySummary,
) {
    for asset in assets {
        let Some(close) = columns.get(&(asset.clone(), "close".to_string())) else {
            continue;
        };
        let mut prev: Option<f64> = None;
        let mut flagged_dates = Vec::new();
        for (i, value) in close.iter().enumerate() {
            if let (Some(p), Some(v)) = (prev, value) {
                if p != 0.0 {
                    let ret = v / p - 1.0;
                    if ret.abs() >= guardrails.corp_action_jump_threshold {
                        flagged_dates.push((i, QualityFlag::SuspectCorpAction));
                    }
                    if let Some(max_abs) = guardrails.max_abs_return {
                        if ret.abs() > max_abs {
                            flagged_dates.push((i, QualityFlag::OutlierReturn));
                        }
                    }
                }
            }
            if value.is_some() {
                prev = *value;
            }
        }
        for (_, flag) in flagged_dates {
            quality.flag(asset, flag);
        }
    }
}

/// `DROP_DATES` policy: a date survives only if every `(asset, field)`
/// column has a value there.
fn drop_incomplete_dates(
    target_index: Vec<NaiveDate>,
    columns: BTreeMap<(String, String), Vec<Option<f64>>>,
) -> (Vec<NaiveDate>, BTreeMap<(String, String), Vec<Option<f64>>>) {
    let complete: Vec<bool> = (0..target_index.len())
        .map(|i| columns.values().all(|col| col[i].is_some()))
        .collect();

    let final_index: Vec<NaiveDate> = target_index
        .into_iter()
        .zip(complete.iter())
        .filter(|(_, keep)| **keep)
        .map(|(date, _)| date)
        .collect();

    let final_columns = columns
        .into_iter()
        .map(|(key, values)| {
            let filtered: Vec<Option<f64>> = values
                .into_iter()
                .zip(complete.iter())
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v)
                .collect();
            (key, filtered)
        })
        .collect();

    (final_index, final_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::provider::FixtureMarketDataProvider;
    use crate::access::request::{GuardrailPolicy, ValidationPolicy};
    use crate::access::symbol_mapper::IdentitySymbolMapper;
    use std::collections::BTreeSet;

    fn calendar() -> VenueCalendar {
        let mut days = BTreeSet::new();
        for d in [2, 5, 6, 7, 8] {
            days.insert(NaiveDate::from_ymd_opt(2026, 1, d).unwrap());
        }
        VenueCalendar {
            mic: "XNYS".to_string(),
            timezone: "America/New_York".to_string(),
            trading_days: days,
            regular_close_local: chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            early_closes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn identical_requests_hit_cache_and_skip_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        let mapper = IdentitySymbolMapper;
        let provider = FixtureMarketDataProvider::new().with_series(
            "AAPL",
            "close",
            vec![
                (NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), 100.0),
                (NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), 101.0),
            ],
        );
        let cal = calendar();
        let service = AccessService {
            cache: &cache,
            symbol_mapper: &mapper,
            provider: &provider,
            calendar: &cal,
            code_version: None,
        };

        let request = TimeSeriesRequest::new(
            vec!["AAPL".to_string()],
            vec!["close".to_string()],
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            "XNYS",
            MissingDataPolicy::NanOk,
            ValidationPolicy::default(),
            GuardrailPolicy::default(),
            None,
        );

        let first = service.get_timeseries(&request).await.unwrap();
        assert_eq!(first.get("AAPL", "close", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()), Some(100.0));

        // Drain the fixture provider of everything, so a second fetch would
        // return nothing unless the cache hit bypasses it entirely.
        let empty_provider = FixtureMarketDataProvider::new();
        let service2 = AccessService {
            cache: &cache,
            symbol_mapper: &mapper,
            provider: &empty_provider,
            calendar: &cal,
            code_version: None,
        };
        let second = service2.get_timeseries(&request).await.unwrap();
        assert_eq!(second.lineage.provider, "fixture");
        assert_eq!(
            second.get("AAPL", "close", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()),
            Some(100.0)
        );
    }

    #[tokio::test]
    async fn calendar_alignment_excludes_non_trading_days() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        let mapper = IdentitySymbolMapper;
        let provider = FixtureMarketDataProvider::new().with_series(
            "AAPL",
            "close",
            vec![
                (NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), 100.0),
                (NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(), 999.0), // Saturday, not a session
                (NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), 101.0),
            ],
        );
        let cal = calendar();
        let service = AccessService {
            cache: &cache,
            symbol_mapper: &mapper,
            provider: &provider,
            calendar: &cal,
            code_version: None,
        };
        let request = TimeSeriesRequest::new(
            vec!["AAPL".to_string()],
            vec!["close".to_string()],
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            "XNYS",
            MissingDataPolicy::NanOk,
            ValidationPolicy::default(),
            GuardrailPolicy::default(),
            None,
        );
        let bundle = service.get_timeseries(&request).await.unwrap();
        assert!(!bundle.date_index.contains(&NaiveDate::from_ymd_opt(2026, 1, 3).unwrap()));
        assert_eq!(bundle.date_index.len(), 3);
    }

    #[tokio::test]
    async fn large_jump_flags_suspect_corp_action_without_correcting_values() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarketCache::new(dir.path());
        let mapper = IdentitySymbolMapper;
        let provider = FixtureMarketDataProvider::new().with_series(
            "AAPL",
            "close",
            vec![
                (NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), 100.0),
                (NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), 50.0),
            ],
        );
        let cal = calendar();
        let service = AccessService {
            cache: &cache,
            symbol_mapper: &mapper,
            provider: &provider,
            calendar: &cal,
            code_version: None,
        };
        let request = TimeSeriesRequest::new(
            vec!["AAPL".to_string()],
            vec!["close".to_string()],
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            "XNYS",
            MissingDataPolicy::NanOk,
            ValidationPolicy::default(),
            GuardrailPolicy::default(),
            None,
        );
        let bundle = service.get_timeseries(&request).await.unwrap();
        assert_eq!(bundle.get("AAPL", "close", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()), Some(50.0));
        assert!(bundle
            .quality
            .flags_by_asset
            .get("AAPL")
            .unwrap()
            .contains(&QualityFlag::SuspectCorpAction));
    }
}
