//! Hard/soft validation (spec §4.4 step 3): hard errors fail the whole
//! batch; soft issues attach a `QualityFlag` to the offending record and
//! the record survives.

use serde::{Deserialize, Serialize};

use crate::canonical::record::{BarRecord, QualityFlag};
use crate::error::IngestionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub accepted: usize,
    pub hard_error_count: usize,
    pub soft_flag_count: usize,
    pub warnings: Vec<String>,
}

/// Runs hard validation (`BarRecord::validate`) over every candidate
/// record, then layers soft checks (non-monotonic index, suspect
/// corporate action via an implausible single-day return) on top,
/// mutating each record's `quality_flags` in place.
pub struct Validator {
    /// Absolute single-day simple return beyond which a close is flagged
    /// `SUSPECT_CORP_ACTION` rather than rejected outright.
    pub suspect_return_threshold: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            suspect_return_threshold: 0.35,
        }
    }
}

impl Validator {
    #[tracing::instrument(skip(self, records))]
    pub fn validate(&self, records: &mut [BarRecord]) -> Result<ValidationReport, IngestionError> {
        let mut hard_errors = Vec::new();
        for record in records.iter() {
            if let Err(e) = record.validate() {
                hard_errors.push(e.to_string());
            }
        }
        if !hard_errors.is_empty() {
            return Err(IngestionError::Validation {
                hard_error_count: hard_errors.len(),
                detail: hard_errors.join("; "),
            });
        }

        let mut soft_flag_count = 0;
        let mut warnings = Vec::new();

        // Checked in arrival order, not sorted: a genuine out-of-order
        // input is exactly what `NONMONOTONIC_INDEX` exists to catch, and
        // sorting first would hide it by construction.
        let mut prev_by_instrument: std::collections::HashMap<String, (chrono::DateTime<chrono::Utc>, f64)> =
            std::collections::HashMap::new();

        for record in records.iter_mut() {
            let key = record.meta.instrument_id.to_string();
            if let Some((prev_ts, prev_close)) = prev_by_instrument.get(&key).copied() {
                if record.meta.ts <= prev_ts {
                    record.meta.quality_flags.insert(QualityFlag::NonmonotonicIndex);
                    soft_flag_count += 1;
                    warnings.push(format!("non-monotonic timestamp for {key}"));
                }
                if prev_close > 0.0 {
                    let ret = record.close / prev_close - 1.0;
                    if ret.abs() >= self.suspect_return_threshold {
                        record.meta.quality_flags.insert(QualityFlag::SuspectCorpAction);
                        soft_flag_count += 1;
                        warnings.push(format!(
                            "single-day return {ret:.3} for {key} exceeds threshold, flagged SUSPECT_CORP_ACTION"
                        ));
                    }
                }
            }
            prev_by_instrument.insert(key, (record.meta.ts, record.close));
        }

        Ok(ValidationReport {
            accepted: records.len(),
            hard_error_count: 0,
            soft_flag_count,
            warnings,
        })
    }
}
