//! Normalization (spec §4.4 step 2): turns a provider's raw NDJSON
//! payload into candidate `BarRecord`s with a canonical timestamp, before
//! hard/soft validation. One input line that fails to parse as JSON is a
//! normalization failure for the whole batch — provider parsing is
//! all-or-nothing; per-record hard errors are the validator's job.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::canonical::calendar::{derive_ts, SessionRulesTable, VenueCalendar};
use crate::canonical::ids::{Currency, InstrumentId};
use crate::canonical::record::{AdjustmentBasis, BarRecord, RecordMeta, Source};
use crate::error::IngestionError;
use crate::ingestion::provider::RawResponse;

/// One NDJSON line as a provider actually emits it, before it becomes a
/// canonical record.
#[derive(Debug, Clone, Deserialize)]
struct RawBarRow {
    symbol: String,
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
    adj_close: Option<f64>,
    currency: Option<String>,
    /// Provider-reported timestamp, used as the derivation fallback.
    provider_ts: Option<DateTime<Utc>>,
}

pub struct Normalizer<'a> {
    pub mic: &'a str,
    pub instrument_prefix: &'a str,
    pub session_rules: &'a SessionRulesTable,
    pub baseline_calendar: Option<&'a VenueCalendar>,
    pub dataset_id: &'a str,
    pub schema_version: u32,
    pub dataset_version: &'a str,
    pub source: Source,
}

impl Normalizer<'_> {
    /// `ingest_run_id` is supplied per call (not stored on the struct) so
    /// one `Normalizer` can be reused across runs without stamping stale
    /// ids onto records from a later run.
    #[tracing::instrument(skip(self, raw))]
    pub fn normalize(&self, raw: &RawResponse, ingest_run_id: &str) -> Result<Vec<BarRecord>, IngestionError> {
        let text = std::str::from_utf8(&raw.payload).map_err(|e| IngestionError::Normalization {
            dataset_id: self.dataset_id.to_string(),
            detail: format!("payload is not valid UTF-8: {e}"),
        })?;

        let mut records = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: RawBarRow = serde_json::from_str(line).map_err(|e| IngestionError::Normalization {
                dataset_id: self.dataset_id.to_string(),
                detail: format!("line {}: {e}", line_no + 1),
            })?;
            records.push(self.row_to_record(row, ingest_run_id)?);
        }

        tracing::debug!(count = records.len(), "normalized raw response into candidate bars");
        Ok(records)
    }

    fn row_to_record(&self, row: RawBarRow, ingest_run_id: &str) -> Result<BarRecord, IngestionError> {
        let instrument_id =
            InstrumentId::new(format!("{}.{}", self.instrument_prefix, row.symbol)).map_err(|e| {
                IngestionError::Normalization {
                    dataset_id: self.dataset_id.to_string(),
                    detail: e.to_string(),
                }
            })?;

        let derived = derive_ts(
            self.mic,
            row.date,
            self.session_rules,
            self.baseline_calendar,
            row.provider_ts,
        )
        .map_err(|e| IngestionError::Normalization {
            dataset_id: self.dataset_id.to_string(),
            detail: e.to_string(),
        })?;

        let currency = row
            .currency
            .map(|c| Currency::new(&c))
            .transpose()
            .map_err(|e| IngestionError::Normalization {
                dataset_id: self.dataset_id.to_string(),
                detail: e.to_string(),
            })?;

        let meta = RecordMeta {
            dataset_id: self.dataset_id.to_string(),
            schema_version: self.schema_version,
            dataset_version: self.dataset_version.to_string(),
            instrument_id,
            ts: derived.ts,
            asof_ts: derived.ts,
            ts_provenance: derived.provenance,
            source: self.source.clone(),
            ingest_run_id: ingest_run_id.to_string(),
            quality_flags: derived.flags.into_iter().collect::<BTreeSet<_>>(),
            trading_date_local: Some(row.date),
            timezone_local: self.baseline_calendar.map(|c| c.timezone.clone()),
            currency,
        };

        Ok(BarRecord {
            meta,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            adj_close: row.adj_close,
            adjustment_basis: row.adj_close.map(|_| AdjustmentBasis::SplitAndDividend),
        })
    }
}
